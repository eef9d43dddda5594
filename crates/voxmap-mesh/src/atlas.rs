//! Texture atlas interface.
//!
//! The packer that produces the atlas image lives outside this crate; meshing
//! only needs to know whether it has finished and where each block face's
//! tile ended up.

use rustc_hash::FxHashMap;
use voxmap_core::FaceDirection;
use voxmap_voxel::{BlockTypeCatalog, BlockTypeDef, BlockTypeId};

/// Normalized texture-space rectangle of one atlas tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvRect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl UvRect {
    pub const FULL: Self = Self {
        min: [0.0, 0.0],
        max: [1.0, 1.0],
    };

    /// `[min.x, min.y, max.x, max.y]`.
    pub fn to_array(self) -> [f32; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }
}

pub trait TextureAtlas {
    /// Whether tile lookups are final. Until then greedy meshing is skipped.
    fn is_ready(&self) -> bool;

    /// Tile for one face of a block type, or `None` if it has no texture.
    fn uv_rect(&self, id: BlockTypeId, face: FaceDirection) -> Option<UvRect>;
}

/// Square grid atlas: every distinct texture uri gets one tile, assigned in
/// registration order.
#[derive(Clone, Debug, Default)]
pub struct GridAtlas {
    tiles: FxHashMap<String, u32>,
    faces: FxHashMap<(BlockTypeId, FaceDirection), u32>,
    ready: bool,
}

impl GridAtlas {
    /// An empty atlas that reports itself as not ready.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lays out every texture referenced by `catalog` and marks the atlas ready.
    pub fn from_catalog(catalog: &BlockTypeCatalog) -> Self {
        let mut atlas = Self::new();
        for def in catalog.iter() {
            atlas.add_block_type(def);
        }
        atlas.ready = true;
        atlas
    }

    /// Assigns tiles to the faces of `def`. Faces without a texture get none.
    pub fn add_block_type(&mut self, def: &BlockTypeDef) {
        for face in FaceDirection::ALL {
            let Some(uri) = def.textures.for_face(face) else {
                continue;
            };
            let next = self.tiles.len() as u32;
            let tile = *self.tiles.entry(uri.to_string()).or_insert(next);
            self.faces.insert((def.id, face), tile);
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Tiles per row and column.
    pub fn columns(&self) -> u32 {
        (self.tiles.len() as f64).sqrt().ceil().max(1.0) as u32
    }

    fn tile_rect(&self, tile: u32) -> UvRect {
        let columns = self.columns();
        let size = 1.0 / columns as f32;
        let x = (tile % columns) as f32 * size;
        let y = (tile / columns) as f32 * size;
        UvRect {
            min: [x, y],
            max: [x + size, y + size],
        }
    }
}

impl TextureAtlas for GridAtlas {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn uv_rect(&self, id: BlockTypeId, face: FaceDirection) -> Option<UvRect> {
        self.faces
            .get(&(id, face))
            .map(|&tile| self.tile_rect(tile))
    }
}
