//! Last-resort tier: one primitive per block.

use std::sync::Arc;

use tracing::warn;
use voxmap_core::BlockPos;
use voxmap_voxel::{BlockTypeCatalog, BlockTypeId, ChunkSnapshot};

use crate::atlas::TextureAtlas;
use crate::builder::MeshBuildError;
use crate::cache::{Geometry, GeometryCache, Material, MaterialCache};

#[derive(Clone, Debug)]
pub struct Primitive {
    pub position: BlockPos,
    pub block_type: BlockTypeId,
    pub geometry: Arc<Geometry>,
    pub material: Arc<Material>,
}

/// Emits a primitive for every block of a known type. Unknown types are
/// skipped; the tier fails only if nothing is left.
pub fn individual_primitives(
    snapshot: &ChunkSnapshot,
    catalog: &BlockTypeCatalog,
    atlas: &dyn TextureAtlas,
    geometry: &mut GeometryCache,
    materials: &mut MaterialCache,
) -> Result<Vec<Primitive>, MeshBuildError> {
    let mut primitives = Vec::with_capacity(snapshot.len());
    let mut skipped = 0usize;
    for &(position, id) in snapshot.blocks() {
        let Some(def) = catalog.get(id) else {
            skipped += 1;
            continue;
        };
        primitives.push(Primitive {
            position,
            block_type: id,
            geometry: geometry.get_or_create(def),
            material: materials.get_or_create(def, atlas),
        });
    }

    if skipped > 0 {
        warn!(chunk = %snapshot.key(), skipped, "skipped blocks of unknown type");
    }
    if primitives.is_empty() {
        return Err(MeshBuildError::NothingBuilt { skipped });
    }
    Ok(primitives)
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;
    use voxmap_core::ChunkKey;
    use voxmap_voxel::BlockTypeDef;

    use super::*;
    use crate::atlas::GridAtlas;

    fn build(blocks: Vec<(BlockPos, BlockTypeId)>) -> Result<Vec<Primitive>, MeshBuildError> {
        let catalog =
            BlockTypeCatalog::from_defs([BlockTypeDef::cube(1, "stone", "stone.png")]).unwrap();
        let atlas = GridAtlas::from_catalog(&catalog);
        let snap = ChunkSnapshot::new(ChunkKey::new(0, 0, 0), 16, 1, blocks, FxHashMap::default());
        individual_primitives(
            &snap,
            &catalog,
            &atlas,
            &mut GeometryCache::new(),
            &mut MaterialCache::new(),
        )
    }

    #[test]
    fn test_one_primitive_per_block() {
        let prims = build(vec![
            (BlockPos::new(0, 0, 0), BlockTypeId(1)),
            (BlockPos::new(5, 5, 5), BlockTypeId(1)),
        ])
        .unwrap();
        assert_eq!(prims.len(), 2);
        assert!(Arc::ptr_eq(&prims[0].geometry, &prims[1].geometry));
    }

    #[test]
    fn test_unknown_types_are_skipped() {
        let prims = build(vec![
            (BlockPos::new(0, 0, 0), BlockTypeId(1)),
            (BlockPos::new(1, 0, 0), BlockTypeId(7)),
        ])
        .unwrap();
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].position, BlockPos::new(0, 0, 0));
    }

    #[test]
    fn test_all_unknown_fails() {
        let err = build(vec![(BlockPos::new(1, 0, 0), BlockTypeId(7))]).unwrap_err();
        assert!(matches!(err, MeshBuildError::NothingBuilt { skipped: 1 }));
    }
}
