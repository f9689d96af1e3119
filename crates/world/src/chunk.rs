use std::fmt;

use skyfall_core::BlockPos;

use crate::materials::{MaterialId, AIR};

/// Chunk width (X axis) in blocks.
pub const CHUNK_SIZE_X: usize = 16;
/// Chunk height (Y axis) in blocks.
pub const CHUNK_SIZE_Y: usize = 256;
/// Chunk depth (Z axis) in blocks.
pub const CHUNK_SIZE_Z: usize = 16;
/// Total block count per chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z;

/// Chunk-local position (X, Y, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl LocalPos {
    /// Convert to a linear index within the block array.
    pub fn index(self) -> usize {
        debug_assert!(self.x < CHUNK_SIZE_X);
        debug_assert!(self.y < CHUNK_SIZE_Y);
        debug_assert!(self.z < CHUNK_SIZE_Z);
        (self.y * CHUNK_SIZE_Z + self.z) * CHUNK_SIZE_X + self.x
    }
}

/// Chunk coordinate (X,Z) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing the given block column.
    pub fn of_block(pos: BlockPos) -> Self {
        Self {
            x: pos.x.div_euclid(CHUNK_SIZE_X as i32),
            z: pos.z.div_euclid(CHUNK_SIZE_Z as i32),
        }
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Split a world position into its chunk and local coordinates.
///
/// Returns `None` when `y` lies outside the chunk column.
pub fn split_block_pos(pos: BlockPos) -> Option<(ChunkPos, LocalPos)> {
    if pos.y < 0 || pos.y >= CHUNK_SIZE_Y as i32 {
        return None;
    }
    let local = LocalPos {
        x: pos.x.rem_euclid(CHUNK_SIZE_X as i32) as usize,
        y: pos.y as usize,
        z: pos.z.rem_euclid(CHUNK_SIZE_Z as i32) as usize,
    };
    Some((ChunkPos::of_block(pos), local))
}

/// Dense column of material ids.
pub struct Chunk {
    position: ChunkPos,
    blocks: Vec<MaterialId>,
}

impl Chunk {
    /// Allocate a fresh chunk filled with air.
    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            blocks: vec![AIR; CHUNK_VOLUME],
        }
    }

    #[inline]
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// Fetch the material at a local position.
    pub fn block(&self, local: LocalPos) -> MaterialId {
        self.blocks[local.index()]
    }

    /// Set the material at a local position, returning the previous value.
    pub fn set_block(&mut self, local: LocalPos, id: MaterialId) -> MaterialId {
        std::mem::replace(&mut self.blocks[local.index()], id)
    }
}
