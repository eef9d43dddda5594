//! Tiered chunk mesh construction.
//!
//! Tiers are tried in order: greedy, instanced, individual. Each failure
//! falls through to the next tier; only when the last one fails does the
//! build return an error, and the caller retries the chunk later.

use glam::Vec3;
use thiserror::Error;
use tracing::debug;
use voxmap_core::{Aabb, FaceDirection};
use voxmap_voxel::{BlockTypeCatalog, BlockTypeId, ChunkSnapshot};

use crate::atlas::TextureAtlas;
use crate::cache::{GeometryCache, MaterialCache};
use crate::greedy::greedy_mesh;
use crate::individual::individual_primitives;
use crate::instanced::instance_batches;
use crate::mesh_set::MeshSet;

/// Errors that can occur while building a chunk mesh.
#[derive(Debug, Error, PartialEq)]
pub enum MeshBuildError {
    /// The snapshot holds no blocks.
    #[error("chunk has no blocks")]
    EmptyChunk,
    /// A block references a type the catalog does not define.
    #[error("unknown block type {0:?}")]
    UnknownBlockType(BlockTypeId),
    /// Greedy merging only handles cubes.
    #[error("block type {0:?} is not a cube")]
    UnsupportedGeometry(BlockTypeId),
    /// The atlas has no tile for a face.
    #[error("block type {id:?} has no atlas tile for {face:?}")]
    MissingUv { id: BlockTypeId, face: FaceDirection },
    /// An instance batch would exceed the chunk volume.
    #[error("{count} instances exceed batch capacity {capacity}")]
    CapacityExceeded { count: usize, capacity: usize },
    /// Every block was skipped.
    #[error("no primitives built ({skipped} blocks skipped)")]
    NothingBuilt { skipped: usize },
}

/// Which optional tiers may run. Individual primitives are always allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshToggles {
    pub greedy: bool,
    pub instancing: bool,
}

impl Default for MeshToggles {
    fn default() -> Self {
        Self {
            greedy: true,
            instancing: true,
        }
    }
}

#[derive(Debug)]
pub struct MeshOutput {
    pub mesh_set: MeshSet,
    /// The atlas was not ready; rebuild once it is to get final textures.
    pub pending_atlas: bool,
}

/// Owns the geometry and material caches shared by every chunk it builds.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    geometry: GeometryCache,
    materials: MaterialCache,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(
        &mut self,
        snapshot: &ChunkSnapshot,
        catalog: &BlockTypeCatalog,
        atlas: &dyn TextureAtlas,
        toggles: MeshToggles,
    ) -> Result<MeshOutput, MeshBuildError> {
        if snapshot.is_empty() {
            return Err(MeshBuildError::EmptyChunk);
        }
        let coverage = snapshot.len();
        let bounds = block_bounds(snapshot);
        let pending_atlas = !atlas.is_ready();
        let key = snapshot.key();

        if toggles.greedy {
            if pending_atlas {
                debug!(chunk = %key, "atlas not ready; skipping greedy tier");
            } else {
                match greedy_mesh(snapshot, catalog, atlas, &mut self.materials) {
                    Ok(surfaces) => {
                        return Ok(self.finish(
                            snapshot,
                            MeshSet::Greedy {
                                surfaces,
                                coverage,
                                bounds,
                            },
                            pending_atlas,
                        ));
                    }
                    Err(e) => debug!(chunk = %key, error = %e, "greedy tier failed"),
                }
            }
        }

        if toggles.instancing {
            match instance_batches(
                snapshot,
                catalog,
                atlas,
                &mut self.geometry,
                &mut self.materials,
            ) {
                Ok(batches) => {
                    return Ok(self.finish(
                        snapshot,
                        MeshSet::Instanced {
                            batches,
                            coverage,
                            bounds,
                        },
                        pending_atlas,
                    ));
                }
                Err(e) => debug!(chunk = %key, error = %e, "instanced tier failed"),
            }
        }

        let primitives = individual_primitives(
            snapshot,
            catalog,
            atlas,
            &mut self.geometry,
            &mut self.materials,
        )?;
        Ok(self.finish(
            snapshot,
            MeshSet::Individual {
                primitives,
                coverage,
                bounds,
            },
            pending_atlas,
        ))
    }

    fn finish(&self, snapshot: &ChunkSnapshot, mesh_set: MeshSet, pending_atlas: bool) -> MeshOutput {
        debug!(
            chunk = %snapshot.key(),
            version = snapshot.version(),
            tier = %mesh_set.tier(),
            blocks = mesh_set.coverage(),
            primitives = mesh_set.primitive_count(),
            "chunk mesh built"
        );
        MeshOutput {
            mesh_set,
            pending_atlas,
        }
    }

    pub fn geometry_cache(&self) -> &GeometryCache {
        &self.geometry
    }

    pub fn material_cache(&self) -> &MaterialCache {
        &self.materials
    }

    /// Drops every cached entry, e.g. after the catalog or atlas changed.
    pub fn clear_caches(&mut self) {
        self.geometry.clear();
        self.materials.clear();
    }
}

fn block_bounds(snapshot: &ChunkSnapshot) -> Aabb {
    let mut bounds = Aabb::empty();
    for &(pos, _) in snapshot.blocks() {
        let min = pos.min_corner();
        bounds.include(&Aabb::new(min, min + Vec3::ONE));
    }
    bounds
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;
    use voxmap_core::{BlockPos, ChunkKey};
    use voxmap_voxel::{BlockTypeDef, GeometryHint};

    use super::*;
    use crate::atlas::GridAtlas;
    use crate::mesh_set::MeshTier;

    const STONE: BlockTypeId = BlockTypeId(1);
    const FLOWER: BlockTypeId = BlockTypeId(4);

    fn catalog() -> BlockTypeCatalog {
        let mut flower = BlockTypeDef::cube(4, "flower", "flower.png");
        flower.geometry = GeometryHint::Sprite;
        BlockTypeCatalog::from_defs([BlockTypeDef::cube(1, "stone", "stone.png"), flower])
            .unwrap()
    }

    fn snapshot(blocks: Vec<(BlockPos, BlockTypeId)>) -> ChunkSnapshot {
        ChunkSnapshot::new(ChunkKey::new(0, 0, 0), 16, 3, blocks, FxHashMap::default())
    }

    #[test]
    fn test_cube_chunk_builds_greedy() {
        let catalog = catalog();
        let atlas = GridAtlas::from_catalog(&catalog);
        let mut builder = MeshBuilder::new();
        let out = builder
            .build(
                &snapshot(vec![(BlockPos::new(2, 3, 4), STONE)]),
                &catalog,
                &atlas,
                MeshToggles::default(),
            )
            .unwrap();
        assert_eq!(out.mesh_set.tier(), MeshTier::Greedy);
        assert!(!out.pending_atlas);
        assert_eq!(out.mesh_set.coverage(), 1);
        assert_eq!(
            out.mesh_set.bounds(),
            Aabb::new(Vec3::new(2.0, 3.0, 4.0), Vec3::new(3.0, 4.0, 5.0))
        );
    }

    #[test]
    fn test_sprite_falls_back_to_instanced() {
        let catalog = catalog();
        let atlas = GridAtlas::from_catalog(&catalog);
        let mut builder = MeshBuilder::new();
        let out = builder
            .build(
                &snapshot(vec![
                    (BlockPos::new(0, 0, 0), STONE),
                    (BlockPos::new(0, 1, 0), FLOWER),
                ]),
                &catalog,
                &atlas,
                MeshToggles::default(),
            )
            .unwrap();
        assert_eq!(out.mesh_set.tier(), MeshTier::Instanced);
        assert_eq!(out.mesh_set.primitive_count(), 2);
    }

    #[test]
    fn test_unknown_type_falls_back_to_individual() {
        let catalog = catalog();
        let atlas = GridAtlas::from_catalog(&catalog);
        let mut builder = MeshBuilder::new();
        let out = builder
            .build(
                &snapshot(vec![
                    (BlockPos::new(0, 0, 0), STONE),
                    (BlockPos::new(1, 0, 0), BlockTypeId(42)),
                ]),
                &catalog,
                &atlas,
                MeshToggles::default(),
            )
            .unwrap();
        assert_eq!(out.mesh_set.tier(), MeshTier::Individual);
        assert_eq!(out.mesh_set.primitive_count(), 1);
        assert_eq!(out.mesh_set.coverage(), 2);
    }

    #[test]
    fn test_all_tiers_failing_returns_error() {
        let catalog = catalog();
        let atlas = GridAtlas::from_catalog(&catalog);
        let mut builder = MeshBuilder::new();
        let result = builder.build(
            &snapshot(vec![(BlockPos::new(0, 0, 0), BlockTypeId(42))]),
            &catalog,
            &atlas,
            MeshToggles::default(),
        );
        assert_eq!(result.unwrap_err(), MeshBuildError::NothingBuilt { skipped: 1 });
    }

    #[test]
    fn test_unready_atlas_skips_greedy_and_flags_pending() {
        let catalog = catalog();
        let mut atlas = GridAtlas::from_catalog(&catalog);
        atlas.set_ready(false);
        let mut builder = MeshBuilder::new();
        let out = builder
            .build(
                &snapshot(vec![(BlockPos::new(0, 0, 0), STONE)]),
                &catalog,
                &atlas,
                MeshToggles::default(),
            )
            .unwrap();
        assert!(out.pending_atlas);
        assert_eq!(out.mesh_set.tier(), MeshTier::Instanced);
    }

    #[test]
    fn test_toggles_disable_tiers() {
        let catalog = catalog();
        let atlas = GridAtlas::from_catalog(&catalog);
        let mut builder = MeshBuilder::new();
        let toggles = MeshToggles {
            greedy: false,
            instancing: false,
        };
        let out = builder
            .build(&snapshot(vec![(BlockPos::new(0, 0, 0), STONE)]), &catalog, &atlas, toggles)
            .unwrap();
        assert_eq!(out.mesh_set.tier(), MeshTier::Individual);
    }

    #[test]
    fn test_empty_chunk_is_an_error() {
        let catalog = catalog();
        let atlas = GridAtlas::from_catalog(&catalog);
        let mut builder = MeshBuilder::new();
        let result = builder.build(&snapshot(Vec::new()), &catalog, &atlas, MeshToggles::default());
        assert_eq!(result.unwrap_err(), MeshBuildError::EmptyChunk);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let catalog = catalog();
        let atlas = GridAtlas::from_catalog(&catalog);
        let mut builder = MeshBuilder::new();
        let snap = snapshot(vec![
            (BlockPos::new(0, 0, 0), STONE),
            (BlockPos::new(1, 0, 0), STONE),
            (BlockPos::new(1, 1, 0), STONE),
        ]);
        let a = builder.build(&snap, &catalog, &atlas, MeshToggles::default()).unwrap();
        let b = builder.build(&snap, &catalog, &atlas, MeshToggles::default()).unwrap();
        assert_eq!(a.mesh_set.tier(), b.mesh_set.tier());
        assert_eq!(a.mesh_set.coverage(), b.mesh_set.coverage());
        assert_eq!(a.mesh_set.bounds(), b.mesh_set.bounds());
        assert_eq!(a.mesh_set.triangle_count(), b.mesh_set.triangle_count());
    }

    #[test]
    fn test_caches_are_shared_across_builds() {
        let catalog = catalog();
        let atlas = GridAtlas::from_catalog(&catalog);
        let mut builder = MeshBuilder::new();
        let toggles = MeshToggles {
            greedy: false,
            instancing: true,
        };
        for x in 0..3 {
            let snap = ChunkSnapshot::new(
                ChunkKey::new(x, 0, 0),
                16,
                1,
                vec![(BlockPos::new(x * 16, 0, 0), STONE)],
                FxHashMap::default(),
            );
            builder.build(&snap, &catalog, &atlas, toggles).unwrap();
        }
        assert_eq!(builder.geometry_cache().len(), 1);
        assert_eq!(builder.material_cache().len(), 1);
    }
}
