//! Seam to whatever draws the chunk meshes.

use rustc_hash::FxHashMap;
use voxmap_core::ChunkKey;
use voxmap_mesh::{MeshSet, MeshTier};

/// Receives mesh attach and detach calls from the terrain.
pub trait SceneGraph {
    /// Attaches (or replaces) the mesh drawn for `key`.
    fn attach(&mut self, key: ChunkKey, mesh: &MeshSet);
    fn detach(&mut self, key: ChunkKey);
}

/// What a [`HeadlessScene`] remembers about an attached mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachedMesh {
    pub tier: MeshTier,
    pub coverage: usize,
    pub primitives: usize,
}

/// Scene graph that only records attachments.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    attached: FxHashMap<ChunkKey, AttachedMesh>,
    attach_calls: usize,
    detach_calls: usize,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self, key: ChunkKey) -> bool {
        self.attached.contains_key(&key)
    }

    pub fn get(&self, key: ChunkKey) -> Option<&AttachedMesh> {
        self.attached.get(&key)
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    pub fn attach_calls(&self) -> usize {
        self.attach_calls
    }

    pub fn detach_calls(&self) -> usize {
        self.detach_calls
    }

    /// Total primitives across every attached mesh.
    pub fn draw_calls(&self) -> usize {
        self.attached.values().map(|m| m.primitives).sum()
    }
}

impl SceneGraph for HeadlessScene {
    fn attach(&mut self, key: ChunkKey, mesh: &MeshSet) {
        self.attach_calls += 1;
        self.attached.insert(
            key,
            AttachedMesh {
                tier: mesh.tier(),
                coverage: mesh.coverage(),
                primitives: mesh.primitive_count(),
            },
        );
    }

    fn detach(&mut self, key: ChunkKey) {
        if self.attached.remove(&key).is_some() {
            self.detach_calls += 1;
        }
    }
}
