//! Renderable output of one chunk build. Exactly one tier per chunk.

use std::fmt;

use voxmap_core::Aabb;

use crate::individual::Primitive;
use crate::instanced::InstanceBatch;
use crate::surface::Surface;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshTier {
    Greedy,
    Instanced,
    Individual,
}

impl fmt::Display for MeshTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeshTier::Greedy => "greedy",
            MeshTier::Instanced => "instanced",
            MeshTier::Individual => "individual",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub enum MeshSet {
    /// Merged quads, one surface per block type.
    Greedy {
        surfaces: Vec<Surface>,
        coverage: usize,
        bounds: Aabb,
    },
    /// One translation-only batch per block type.
    Instanced {
        batches: Vec<InstanceBatch>,
        coverage: usize,
        bounds: Aabb,
    },
    /// One primitive per block.
    Individual {
        primitives: Vec<Primitive>,
        coverage: usize,
        bounds: Aabb,
    },
}

/// What [`MeshSet::dispose`] released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisposeReport {
    pub tier: Option<MeshTier>,
    /// Owned vertex and index buffers freed.
    pub buffers_freed: usize,
    /// Shared geometry/material handles released back to the caches.
    pub shared_released: usize,
}

impl MeshSet {
    pub fn tier(&self) -> MeshTier {
        match self {
            MeshSet::Greedy { .. } => MeshTier::Greedy,
            MeshSet::Instanced { .. } => MeshTier::Instanced,
            MeshSet::Individual { .. } => MeshTier::Individual,
        }
    }

    /// Number of blocks the mesh represents.
    pub fn coverage(&self) -> usize {
        match self {
            MeshSet::Greedy { coverage, .. }
            | MeshSet::Instanced { coverage, .. }
            | MeshSet::Individual { coverage, .. } => *coverage,
        }
    }

    /// World-space bounds of every block covered.
    pub fn bounds(&self) -> Aabb {
        match self {
            MeshSet::Greedy { bounds, .. }
            | MeshSet::Instanced { bounds, .. }
            | MeshSet::Individual { bounds, .. } => *bounds,
        }
    }

    /// Number of separately drawn objects: surfaces, batches, or primitives.
    pub fn primitive_count(&self) -> usize {
        match self {
            MeshSet::Greedy { surfaces, .. } => surfaces.len(),
            MeshSet::Instanced { batches, .. } => batches.len(),
            MeshSet::Individual { primitives, .. } => primitives.len(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        match self {
            MeshSet::Greedy { surfaces, .. } => {
                surfaces.iter().map(|s| s.buffers.triangle_count()).sum()
            }
            MeshSet::Instanced { batches, .. } => batches
                .iter()
                .map(|b| b.geometry.buffers.triangle_count() * b.translations.len())
                .sum(),
            MeshSet::Individual { primitives, .. } => primitives
                .iter()
                .map(|p| p.geometry.buffers.triangle_count())
                .sum(),
        }
    }

    /// Frees the buffers this mesh owns. Cached geometry and materials are
    /// only released, never freed.
    pub fn dispose(self) -> DisposeReport {
        let tier = Some(self.tier());
        match self {
            MeshSet::Greedy { surfaces, .. } => DisposeReport {
                tier,
                buffers_freed: surfaces.len() * 2,
                shared_released: surfaces.len(),
            },
            MeshSet::Instanced { batches, .. } => DisposeReport {
                tier,
                buffers_freed: batches.len(),
                shared_released: batches.len() * 2,
            },
            MeshSet::Individual { primitives, .. } => DisposeReport {
                tier,
                buffers_freed: 0,
                shared_released: primitives.len() * 2,
            },
        }
    }
}
