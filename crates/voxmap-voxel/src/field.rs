//! The sparse block field: source of truth for terrain content.
//!
//! Blocks are stored partitioned by chunk, so point lookups stay O(1) and the
//! per-chunk dirty/version bookkeeping lives next to the data it describes.

use rustc_hash::FxHashMap;
use voxmap_core::{BlockPos, ChunkKey, FaceDirection};

use crate::catalog::BlockTypeId;
use crate::chunk::ChunkRecord;
use crate::snapshot::ChunkSnapshot;

/// Chunk keys affected by an edit. The owning chunk comes first; face
/// neighbours follow when the edit sits on a chunk boundary.
pub type TouchedChunks = Vec<ChunkKey>;

#[derive(Clone, Debug)]
pub struct VoxelField {
    chunk_size: i32,
    chunks: FxHashMap<ChunkKey, ChunkRecord>,
    len: usize,
}

impl VoxelField {
    /// Creates an empty field partitioned into chunks of edge `chunk_size`.
    pub fn new(chunk_size: i32) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunks: FxHashMap::default(),
            len: 0,
        }
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// Total number of blocks.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, pos: BlockPos) -> Option<BlockTypeId> {
        self.chunks.get(&pos.chunk(self.chunk_size))?.get(pos)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.get(pos).is_some()
    }

    /// Places `id` at `pos`, overwriting whatever was there.
    ///
    /// Setting air is a removal. Rewriting the same id is a no-op and
    /// touches nothing.
    pub fn set_block(&mut self, pos: BlockPos, id: BlockTypeId) -> TouchedChunks {
        if id.is_air() {
            return self.remove_block(pos);
        }
        let key = pos.chunk(self.chunk_size);
        let chunk = self.chunks.entry(key).or_default();
        match chunk.insert(pos, id) {
            Some(prev) if prev == id => return Vec::new(),
            Some(_) => {}
            None => self.len += 1,
        }
        chunk.mark_dirty();
        self.touch_boundary_neighbors(pos, key)
    }

    /// Removes the block at `pos`. Removing an absent block is a no-op.
    ///
    /// The chunk record stays behind even when it becomes empty; the build
    /// pass drops it through [`VoxelField::remove_chunk_if_empty`].
    pub fn remove_block(&mut self, pos: BlockPos) -> TouchedChunks {
        let key = pos.chunk(self.chunk_size);
        let Some(chunk) = self.chunks.get_mut(&key) else {
            return Vec::new();
        };
        if chunk.remove(pos).is_none() {
            return Vec::new();
        }
        self.len -= 1;
        chunk.mark_dirty();
        self.touch_boundary_neighbors(pos, key)
    }

    /// Drops every block and chunk record.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }

    /// Inserts without boundary propagation. Used by bulk loading, where
    /// every chunk ends up dirty anyway.
    pub(crate) fn insert_raw(&mut self, pos: BlockPos, id: BlockTypeId) {
        if id.is_air() {
            return;
        }
        let chunk = self.chunks.entry(pos.chunk(self.chunk_size)).or_default();
        if chunk.insert(pos, id).is_none() {
            self.len += 1;
        }
        if !chunk.is_dirty() {
            chunk.mark_dirty();
        }
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&ChunkRecord> {
        self.chunks.get(&key)
    }

    pub fn chunk_mut(&mut self, key: ChunkKey) -> Option<&mut ChunkRecord> {
        self.chunks.get_mut(&key)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk_keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.chunks.keys().copied()
    }

    /// Keys of chunks whose mesh is stale.
    pub fn dirty_chunks(&self) -> Vec<ChunkKey> {
        self.chunks
            .iter()
            .filter(|(_, c)| c.is_dirty())
            .map(|(&k, _)| k)
            .collect()
    }

    /// Removes the chunk record if it holds no blocks. Returns whether it did.
    pub fn remove_chunk_if_empty(&mut self, key: ChunkKey) -> bool {
        if self.chunks.get(&key).is_some_and(ChunkRecord::is_empty) {
            self.chunks.remove(&key);
            true
        } else {
            false
        }
    }

    /// Iterates over every block in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, BlockTypeId)> + '_ {
        self.chunks.values().flat_map(ChunkRecord::iter)
    }

    /// Copies a chunk's blocks (plus the neighbouring shell) for meshing.
    pub fn snapshot_chunk(&self, key: ChunkKey) -> Option<ChunkSnapshot> {
        let chunk = self.chunks.get(&key)?;
        Some(ChunkSnapshot::capture(
            key,
            self.chunk_size,
            chunk.version(),
            chunk.iter().collect(),
            |p| self.get(p),
        ))
    }

    /// Marks face-adjacent chunks dirty when `pos` lies on the boundary of
    /// `owner`. Returns the owner followed by every neighbour touched.
    fn touch_boundary_neighbors(&mut self, pos: BlockPos, owner: ChunkKey) -> TouchedChunks {
        let mut touched = vec![owner];
        for dir in FaceDirection::ALL {
            let v = dir.ivec();
            let neighbor = pos.offset(v.x, v.y, v.z).chunk(self.chunk_size);
            if neighbor == owner || touched.contains(&neighbor) {
                continue;
            }
            if let Some(chunk) = self.chunks.get_mut(&neighbor) {
                chunk.mark_dirty();
                touched.push(neighbor);
            }
        }
        touched
    }
}

impl Default for VoxelField {
    fn default() -> Self {
        Self::new(16)
    }
}
