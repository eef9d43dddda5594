//! Shared per-block-type geometry and materials.
//!
//! Instanced and individual meshes reference these through `Arc` handles, so
//! disposing a chunk's mesh never frees them. Entries live until the caches
//! are cleared.

use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;
use tracing::warn;
use voxmap_core::FaceDirection;
use voxmap_voxel::{BlockTypeDef, BlockTypeId, GeometryHint};

use crate::atlas::{TextureAtlas, UvRect};
use crate::surface::{SurfaceBuffers, SurfaceVertex};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Unit-sized template geometry, positioned by instance translation.
#[derive(Debug)]
pub struct Geometry {
    pub hint: GeometryHint,
    pub buffers: SurfaceBuffers,
}

impl Geometry {
    /// Unit cube spanning `[0, 1]³`.
    pub fn cube() -> Self {
        let mut buffers = SurfaceBuffers::new();
        for dir in FaceDirection::ALL {
            buffers.push_quad(dir, 0, 0, 0, 1, 1, Vec3::ZERO, UvRect::FULL);
        }
        Self {
            hint: GeometryHint::Cube,
            buffers,
        }
    }

    /// Two crossed vertical quads through the cell's diagonals, double-sided.
    pub fn sprite() -> Self {
        let mut buffers = SurfaceBuffers::new();
        let planes = [
            ([0.0, 0.0], [1.0, 1.0]),
            ([1.0, 0.0], [0.0, 1.0]),
        ];
        for (a, b) in planes {
            let base = buffers.vertices.len() as u32;
            let normal = Vec3::new(b[1] - a[1], 0.0, a[0] - b[0]).normalize().to_array();
            let corners = [
                ([a[0], 0.0, a[1]], [0.0, 0.0]),
                ([b[0], 0.0, b[1]], [1.0, 0.0]),
                ([b[0], 1.0, b[1]], [1.0, 1.0]),
                ([a[0], 1.0, a[1]], [0.0, 1.0]),
            ];
            for (position, uv) in corners {
                buffers.vertices.push(SurfaceVertex {
                    position,
                    normal,
                    uv,
                    uv_rect: UvRect::FULL.to_array(),
                });
            }
            buffers.indices.extend_from_slice(&[
                base,
                base + 1,
                base + 2,
                base,
                base + 2,
                base + 3,
                base,
                base + 2,
                base + 1,
                base,
                base + 3,
                base + 2,
            ]);
        }
        Self {
            hint: GeometryHint::Sprite,
            buffers,
        }
    }

    pub fn for_hint(hint: GeometryHint) -> Self {
        match hint {
            GeometryHint::Cube => Self::cube(),
            GeometryHint::Sprite => Self::sprite(),
        }
    }
}

#[derive(Debug, Default)]
pub struct GeometryCache {
    entries: FxHashMap<BlockTypeId, Arc<Geometry>>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, def: &BlockTypeDef) -> Arc<Geometry> {
        Arc::clone(
            self.entries
                .entry(def.id)
                .or_insert_with(|| Arc::new(Geometry::for_hint(def.geometry))),
        )
    }

    pub fn get(&self, id: BlockTypeId) -> Option<&Arc<Geometry>> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Material
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub struct Material {
    /// Atlas tile per face, indexed by [`FaceDirection::index`].
    pub faces: [Option<UvRect>; 6],
    pub transparent: bool,
    /// Stand-in used when a type has no usable texture.
    pub is_error: bool,
}

impl Material {
    pub fn error() -> Self {
        Self {
            faces: [None; 6],
            transparent: false,
            is_error: true,
        }
    }

    pub fn face(&self, face: FaceDirection) -> Option<UvRect> {
        self.faces[face.index()]
    }
}

#[derive(Debug)]
pub struct MaterialCache {
    entries: FxHashMap<BlockTypeId, Arc<Material>>,
    error: Arc<Material>,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            error: Arc::new(Material::error()),
        }
    }

    /// Returns the material for `def`, creating it from the atlas on first use.
    ///
    /// Types without any texture get the shared error material. While the
    /// atlas is not ready the error material is returned but not cached, so
    /// a later call picks up the real tiles.
    pub fn get_or_create(&mut self, def: &BlockTypeDef, atlas: &dyn TextureAtlas) -> Arc<Material> {
        if let Some(existing) = self.entries.get(&def.id) {
            return Arc::clone(existing);
        }
        if !atlas.is_ready() {
            return Arc::clone(&self.error);
        }

        let faces = FaceDirection::ALL.map(|face| atlas.uv_rect(def.id, face));
        let material = if faces.iter().all(Option::is_none) {
            warn!(block_type = def.id.0, name = %def.name, "no texture for block type; using error material");
            Arc::clone(&self.error)
        } else {
            Arc::new(Material {
                faces,
                transparent: def.transparent,
                is_error: false,
            })
        };
        self.entries.insert(def.id, Arc::clone(&material));
        material
    }

    pub fn error_material(&self) -> &Arc<Material> {
        &self.error
    }

    pub fn get(&self, id: BlockTypeId) -> Option<&Arc<Material>> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for MaterialCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use voxmap_voxel::{BlockTextures, BlockTypeCatalog};

    use super::*;
    use crate::atlas::GridAtlas;

    fn defs() -> (BlockTypeDef, BlockTypeDef) {
        let stone = BlockTypeDef::cube(1, "stone", "stone.png");
        let mut bare = BlockTypeDef::cube(2, "bare", "");
        bare.textures = BlockTextures::Missing;
        (stone, bare)
    }

    #[test]
    fn test_cube_has_six_faces() {
        let cube = Geometry::cube();
        assert_eq!(cube.buffers.quad_count(), 6);
        assert_eq!(cube.buffers.vertices.len(), 24);
        for v in &cube.buffers.vertices {
            assert!(v.position.iter().all(|&c| (0.0..=1.0).contains(&c)));
        }
    }

    #[test]
    fn test_sprite_is_double_sided() {
        let sprite = Geometry::sprite();
        assert_eq!(sprite.buffers.vertices.len(), 8);
        assert_eq!(sprite.buffers.triangle_count(), 8);
    }

    #[test]
    fn test_geometry_is_shared() {
        let (stone, _) = defs();
        let mut cache = GeometryCache::new();
        let a = cache.get_or_create(&stone);
        let b = cache.get_or_create(&stone);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_material_from_atlas() {
        let (stone, bare) = defs();
        let catalog = BlockTypeCatalog::from_defs([stone.clone(), bare]).unwrap();
        let atlas = GridAtlas::from_catalog(&catalog);
        let mut cache = MaterialCache::new();
        let material = cache.get_or_create(&stone, &atlas);
        assert!(!material.is_error);
        assert!(material.face(FaceDirection::PosY).is_some());
        assert!(Arc::ptr_eq(&material, &cache.get_or_create(&stone, &atlas)));
    }

    #[test]
    fn test_missing_texture_uses_error_material() {
        let (stone, bare) = defs();
        let catalog = BlockTypeCatalog::from_defs([stone, bare.clone()]).unwrap();
        let atlas = GridAtlas::from_catalog(&catalog);
        let mut cache = MaterialCache::new();
        let material = cache.get_or_create(&bare, &atlas);
        assert!(material.is_error);
        assert!(Arc::ptr_eq(&material, cache.error_material()));
    }

    #[test]
    fn test_unready_atlas_is_not_cached() {
        let (stone, _) = defs();
        let mut atlas = GridAtlas::new();
        atlas.add_block_type(&stone);
        let mut cache = MaterialCache::new();
        assert!(cache.get_or_create(&stone, &atlas).is_error);
        assert!(cache.is_empty());

        atlas.set_ready(true);
        assert!(!cache.get_or_create(&stone, &atlas).is_error);
        assert_eq!(cache.len(), 1);
    }
}
