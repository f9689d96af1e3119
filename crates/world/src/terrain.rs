//! Flat terrain used by headless worlds.
//!
//! Columns are layered bedrock / stone / dirt / grass up to a fixed surface
//! height. Generation is a pure function of the block position so chunks can
//! be materialised lazily when first written.

use skyfall_core::BlockPos;

use crate::chunk::{Chunk, ChunkPos, LocalPos, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};
use crate::materials::{MaterialId, Materials, AIR};

/// Default surface height (top grass block).
pub const DEFAULT_SURFACE_Y: i32 = 63;

/// Flat layered terrain generator.
#[derive(Debug, Clone, Copy)]
pub struct FlatTerrain {
    surface_y: i32,
    bedrock: MaterialId,
    stone: MaterialId,
    dirt: MaterialId,
    grass: MaterialId,
}

impl FlatTerrain {
    /// Layered terrain with its top grass block at `surface_y`.
    pub fn new(materials: &Materials, surface_y: i32) -> Self {
        let id = |name: &str| materials.lookup_block(name).unwrap_or(AIR);
        Self {
            surface_y: surface_y.clamp(1, CHUNK_SIZE_Y as i32 - 2),
            bedrock: id("bedrock"),
            stone: id("stone"),
            dirt: id("dirt"),
            grass: id("grass_block"),
        }
    }

    /// Terrain without any blocks at all (useful for isolated tests).
    pub fn void() -> Self {
        Self {
            surface_y: -1,
            bedrock: AIR,
            stone: AIR,
            dirt: AIR,
            grass: AIR,
        }
    }

    /// Height of the top solid block of every column.
    pub fn surface_y(&self) -> i32 {
        self.surface_y
    }

    /// Material generated at `pos`.
    pub fn block_at(&self, pos: BlockPos) -> MaterialId {
        let y = pos.y;
        if y < 0 || y > self.surface_y {
            AIR
        } else if y == 0 {
            self.bedrock
        } else if y == self.surface_y {
            self.grass
        } else if y >= self.surface_y - 3 {
            self.dirt
        } else {
            self.stone
        }
    }

    /// Generate a full chunk.
    pub fn generate_chunk(&self, chunk_pos: ChunkPos) -> Chunk {
        let mut chunk = Chunk::new(chunk_pos);
        if self.surface_y < 0 {
            return chunk;
        }
        let top = (self.surface_y as usize).min(CHUNK_SIZE_Y - 1);
        for y in 0..=top {
            let id = self.block_at(BlockPos::new(0, y as i32, 0));
            for z in 0..CHUNK_SIZE_Z {
                for x in 0..CHUNK_SIZE_X {
                    chunk.set_block(LocalPos { x, y, z }, id);
                }
            }
        }
        chunk
    }
}
