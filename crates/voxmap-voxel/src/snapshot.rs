//! Immutable copy of one chunk's blocks, handed to the mesh builder.
//!
//! Besides the chunk's own blocks, the snapshot carries the blocks that sit
//! directly across each boundary face, so face culling at chunk edges does
//! not need access to the live field.

use rustc_hash::FxHashMap;
use voxmap_core::{BlockPos, ChunkKey, FaceDirection};

use crate::catalog::BlockTypeId;

#[derive(Clone, Debug)]
pub struct ChunkSnapshot {
    key: ChunkKey,
    chunk_size: i32,
    version: u64,
    /// Sorted by position for deterministic iteration and binary search.
    blocks: Vec<(BlockPos, BlockTypeId)>,
    /// Occupied positions one step outside the chunk, adjacent to a block inside it.
    shell: FxHashMap<BlockPos, BlockTypeId>,
}

impl ChunkSnapshot {
    pub fn new(
        key: ChunkKey,
        chunk_size: i32,
        version: u64,
        mut blocks: Vec<(BlockPos, BlockTypeId)>,
        shell: FxHashMap<BlockPos, BlockTypeId>,
    ) -> Self {
        blocks.sort_unstable_by_key(|(p, _)| *p);
        Self {
            key,
            chunk_size,
            version,
            blocks,
            shell,
        }
    }

    /// Captures a snapshot from any block lookup. Positions of `blocks`
    /// must all lie inside `key`.
    pub fn capture(
        key: ChunkKey,
        chunk_size: i32,
        version: u64,
        blocks: Vec<(BlockPos, BlockTypeId)>,
        lookup: impl Fn(BlockPos) -> Option<BlockTypeId>,
    ) -> Self {
        let mut shell = FxHashMap::default();
        for &(pos, _) in &blocks {
            let (lx, ly, lz) = pos.local(chunk_size);
            let edge = (chunk_size - 1) as usize;
            let on_boundary =
                lx == 0 || ly == 0 || lz == 0 || lx == edge || ly == edge || lz == edge;
            if !on_boundary {
                continue;
            }
            for dir in FaceDirection::ALL {
                let n = pos.offset(dir.ivec().x, dir.ivec().y, dir.ivec().z);
                if n.chunk(chunk_size) != key
                    && let Some(id) = lookup(n)
                {
                    shell.insert(n, id);
                }
            }
        }
        Self::new(key, chunk_size, version, blocks, shell)
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// Version of the chunk record at capture time.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn blocks(&self) -> &[(BlockPos, BlockTypeId)] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block at `pos`, looking inside the chunk or in the captured shell.
    pub fn get(&self, pos: BlockPos) -> Option<BlockTypeId> {
        if pos.chunk(self.chunk_size) == self.key {
            self.blocks
                .binary_search_by_key(&pos, |(p, _)| *p)
                .ok()
                .map(|i| self.blocks[i].1)
        } else {
            self.shell.get(&pos).copied()
        }
    }

    /// Distinct block type ids present, ascending.
    pub fn block_types(&self) -> Vec<BlockTypeId> {
        let mut ids: Vec<_> = self.blocks.iter().map(|(_, id)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
