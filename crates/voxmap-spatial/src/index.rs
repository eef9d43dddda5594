//! Spatial hash over block positions, logically partitioned by chunk.
//!
//! Mirrors [`VoxelField`] in a layout tuned for queries: a flat map for O(1)
//! existence checks along rays, plus per-chunk membership sets for
//! chunk-scoped iteration.

use rustc_hash::{FxHashMap, FxHashSet};
use voxmap_core::{BlockPos, ChunkKey};
use voxmap_voxel::{BlockTypeId, VoxelField};

#[derive(Clone, Debug)]
pub struct ChunkIndex {
    chunk_size: i32,
    /// Primary storage: block position -> type id.
    blocks: FxHashMap<BlockPos, BlockTypeId>,
    /// Chunk key -> positions of blocks inside that chunk.
    by_chunk: FxHashMap<ChunkKey, FxHashSet<BlockPos>>,
}

impl ChunkIndex {
    pub fn new(chunk_size: i32) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            blocks: FxHashMap::default(),
            by_chunk: FxHashMap::default(),
        }
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// Return the total number of indexed blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn has_block(&self, pos: BlockPos) -> bool {
        self.blocks.contains_key(&pos)
    }

    pub fn get_block(&self, pos: BlockPos) -> Option<BlockTypeId> {
        self.blocks.get(&pos).copied()
    }

    /// Insert or overwrite a block. Air removes.
    pub fn set_block(&mut self, pos: BlockPos, id: BlockTypeId) {
        if id.is_air() {
            self.remove_block(pos);
            return;
        }
        if self.blocks.insert(pos, id).is_none() {
            self.by_chunk
                .entry(pos.chunk(self.chunk_size))
                .or_default()
                .insert(pos);
        }
    }

    /// Remove a block. Returns `true` if it was present.
    pub fn remove_block(&mut self, pos: BlockPos) -> bool {
        if self.blocks.remove(&pos).is_none() {
            return false;
        }
        let key = pos.chunk(self.chunk_size);
        if let Some(members) = self.by_chunk.get_mut(&key) {
            members.remove(&pos);
            if members.is_empty() {
                self.by_chunk.remove(&key);
            }
        }
        true
    }

    /// Copies the current field value at `pos` into the index.
    pub fn sync_from(&mut self, field: &VoxelField, pos: BlockPos) {
        match field.get(pos) {
            Some(id) => self.set_block(pos, id),
            None => {
                self.remove_block(pos);
            }
        }
    }

    /// Calls `f` for every block inside `chunk`.
    pub fn for_each_in_chunk(&self, chunk: ChunkKey, mut f: impl FnMut(BlockPos, BlockTypeId)) {
        let Some(members) = self.by_chunk.get(&chunk) else {
            return;
        };
        for pos in members {
            if let Some(&id) = self.blocks.get(pos) {
                f(*pos, id);
            }
        }
    }

    /// Number of blocks inside `chunk`.
    pub fn chunk_len(&self, chunk: ChunkKey) -> usize {
        self.by_chunk.get(&chunk).map_or(0, FxHashSet::len)
    }

    /// Keys of every chunk holding at least one block.
    pub fn chunk_keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.by_chunk.keys().copied()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.by_chunk.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, BlockTypeId)> + '_ {
        self.blocks.iter().map(|(&p, &id)| (p, id))
    }
}

impl Default for ChunkIndex {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STONE: BlockTypeId = BlockTypeId(1);

    #[test]
    fn test_insert_and_query() {
        let mut index = ChunkIndex::new(16);
        index.set_block(BlockPos::new(1, 2, 3), STONE);
        assert!(index.has_block(BlockPos::new(1, 2, 3)));
        assert_eq!(index.get_block(BlockPos::new(1, 2, 3)), Some(STONE));
        assert!(!index.has_block(BlockPos::new(0, 0, 0)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_overwrite_keeps_count() {
        let mut index = ChunkIndex::new(16);
        index.set_block(BlockPos::new(1, 2, 3), STONE);
        index.set_block(BlockPos::new(1, 2, 3), BlockTypeId(2));
        assert_eq!(index.len(), 1);
        assert_eq!(index.chunk_len(ChunkKey::new(0, 0, 0)), 1);
        assert_eq!(index.get_block(BlockPos::new(1, 2, 3)), Some(BlockTypeId(2)));
    }

    #[test]
    fn test_remove_cleans_up_empty_chunk() {
        let mut index = ChunkIndex::new(16);
        index.set_block(BlockPos::new(20, 0, 0), STONE);
        assert!(index.remove_block(BlockPos::new(20, 0, 0)));
        assert!(!index.remove_block(BlockPos::new(20, 0, 0)));
        assert_eq!(index.chunk_keys().count(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_for_each_in_chunk_is_scoped() {
        let mut index = ChunkIndex::new(16);
        index.set_block(BlockPos::new(0, 0, 0), STONE);
        index.set_block(BlockPos::new(15, 15, 15), STONE);
        index.set_block(BlockPos::new(16, 0, 0), STONE);
        index.set_block(BlockPos::new(-1, 0, 0), STONE);

        let mut seen = Vec::new();
        index.for_each_in_chunk(ChunkKey::new(0, 0, 0), |p, _| seen.push(p));
        seen.sort();
        assert_eq!(seen, vec![BlockPos::new(0, 0, 0), BlockPos::new(15, 15, 15)]);

        let mut none = 0;
        index.for_each_in_chunk(ChunkKey::new(5, 5, 5), |_, _| none += 1);
        assert_eq!(none, 0);
    }

    #[test]
    fn test_sync_from_field() {
        let mut field = VoxelField::new(16);
        let mut index = ChunkIndex::new(16);
        let pos = BlockPos::new(4, 4, 4);

        field.set_block(pos, STONE);
        index.sync_from(&field, pos);
        assert_eq!(index.get_block(pos), Some(STONE));

        field.remove_block(pos);
        index.sync_from(&field, pos);
        assert!(!index.has_block(pos));
    }

    #[test]
    fn test_set_air_removes() {
        let mut index = ChunkIndex::new(16);
        index.set_block(BlockPos::new(1, 1, 1), STONE);
        index.set_block(BlockPos::new(1, 1, 1), BlockTypeId::AIR);
        assert!(index.is_empty());
    }
}
