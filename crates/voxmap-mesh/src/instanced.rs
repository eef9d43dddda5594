//! Instanced tier: one batch per block type, each instance a translation of
//! the type's shared template geometry.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use voxmap_voxel::{BlockTypeCatalog, BlockTypeId, ChunkSnapshot};

use crate::atlas::TextureAtlas;
use crate::builder::MeshBuildError;
use crate::cache::{Geometry, GeometryCache, Material, MaterialCache};

#[derive(Clone, Debug)]
pub struct InstanceBatch {
    pub block_type: BlockTypeId,
    pub geometry: Arc<Geometry>,
    pub material: Arc<Material>,
    /// Minimum corner of every instance, in world space.
    pub translations: Vec<Vec3>,
}

/// Groups the chunk's blocks by type.
///
/// Every type must be known to the catalog, and no batch may hold more
/// instances than the chunk has cells.
pub fn instance_batches(
    snapshot: &ChunkSnapshot,
    catalog: &BlockTypeCatalog,
    atlas: &dyn TextureAtlas,
    geometry: &mut GeometryCache,
    materials: &mut MaterialCache,
) -> Result<Vec<InstanceBatch>, MeshBuildError> {
    let size = snapshot.chunk_size() as usize;
    let capacity = size * size * size;

    let mut grouped: BTreeMap<BlockTypeId, Vec<Vec3>> = BTreeMap::new();
    for &(pos, id) in snapshot.blocks() {
        if catalog.get(id).is_none() {
            return Err(MeshBuildError::UnknownBlockType(id));
        }
        grouped.entry(id).or_default().push(pos.min_corner());
    }

    let mut batches = Vec::with_capacity(grouped.len());
    for (id, translations) in grouped {
        if translations.len() > capacity {
            return Err(MeshBuildError::CapacityExceeded {
                count: translations.len(),
                capacity,
            });
        }
        let def = catalog.get(id).ok_or(MeshBuildError::UnknownBlockType(id))?;
        batches.push(InstanceBatch {
            block_type: id,
            geometry: geometry.get_or_create(def),
            material: materials.get_or_create(def, atlas),
            translations,
        });
    }
    Ok(batches)
}
