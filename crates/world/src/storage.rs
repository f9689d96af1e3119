use std::collections::BTreeMap;

use crate::{Chunk, ChunkPos};

/// In-memory chunk arena.
/// Uses BTreeMap for deterministic iteration order.
#[derive(Default)]
pub struct ChunkStorage {
    chunks: BTreeMap<ChunkPos, Chunk>,
}

impl ChunkStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true when no chunks are currently stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Obtain mutable access to a chunk, generating it with `generate` if absent.
    pub fn ensure_chunk_with(
        &mut self,
        pos: ChunkPos,
        generate: impl FnOnce(ChunkPos) -> Chunk,
    ) -> &mut Chunk {
        self.chunks.entry(pos).or_insert_with(|| generate(pos))
    }

    /// Attempt to fetch a chunk immutably.
    pub fn get(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    /// Fetch a chunk mutably (without creating it).
    pub fn get_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        self.chunks.get_mut(&pos)
    }

    /// Iterate resident chunk positions in sorted order.
    pub fn positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.chunks.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_generates_once() {
        let mut storage = ChunkStorage::new();
        let mut calls = 0;
        storage.ensure_chunk_with(ChunkPos::new(1, 2), |pos| {
            calls += 1;
            Chunk::new(pos)
        });
        storage.ensure_chunk_with(ChunkPos::new(1, 2), |pos| {
            calls += 1;
            Chunk::new(pos)
        });
        assert_eq!(calls, 1);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn positions_are_sorted() {
        let mut storage = ChunkStorage::new();
        for pos in [ChunkPos::new(3, 0), ChunkPos::new(-1, 5), ChunkPos::new(0, 0)] {
            storage.ensure_chunk_with(pos, Chunk::new);
        }
        let order: Vec<_> = storage.positions().collect();
        assert_eq!(
            order,
            vec![ChunkPos::new(-1, 5), ChunkPos::new(0, 0), ChunkPos::new(3, 0)]
        );
    }
}
