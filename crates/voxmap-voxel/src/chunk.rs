//! Per-chunk block storage with dirty tracking and versioning.

use rustc_hash::FxHashMap;
use voxmap_core::BlockPos;

use crate::catalog::BlockTypeId;

/// The blocks owned by one chunk, plus the bookkeeping the build pipeline
/// needs to know whether its mesh is stale.
///
/// An empty record is kept alive after its last block is removed so the next
/// build pass can observe the transition and release the chunk's mesh.
#[derive(Clone, Debug, Default)]
pub struct ChunkRecord {
    blocks: FxHashMap<BlockPos, BlockTypeId>,
    dirty: bool,
    /// Monotonically increasing version counter, incremented on each mutation.
    version: u64,
}

impl ChunkRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: BlockPos) -> Option<BlockTypeId> {
        self.blocks.get(&pos).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, BlockTypeId)> + '_ {
        self.blocks.iter().map(|(&p, &id)| (p, id))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Flags the chunk for rebuild and bumps its version.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.version += 1;
    }

    /// Clears the dirty flag if nothing changed since `built_version`.
    ///
    /// Returns `false` (leaving the flag set) when a newer edit landed while
    /// the build was in flight.
    pub fn clear_dirty(&mut self, built_version: u64) -> bool {
        if self.version == built_version {
            self.dirty = false;
            true
        } else {
            false
        }
    }

    /// Inserts or overwrites a block. Returns the previous id.
    pub(crate) fn insert(&mut self, pos: BlockPos, id: BlockTypeId) -> Option<BlockTypeId> {
        self.blocks.insert(pos, id)
    }

    pub(crate) fn remove(&mut self, pos: BlockPos) -> Option<BlockTypeId> {
        self.blocks.remove(&pos)
    }
}
