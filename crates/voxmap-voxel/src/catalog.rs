//! Block-type catalog: maps [`BlockTypeId`] values to the metadata the
//! meshing tiers and the occlusion test need.
//!
//! Ids are assigned by the editor (built-in types below 100, custom types
//! from 100 upward), so the catalog is keyed rather than dense. Id 0 is
//! reserved for air and never registered.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use voxmap_core::FaceDirection;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Compact identifier stored for every block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockTypeId(pub u16);

impl BlockTypeId {
    /// Reserved id for empty space.
    pub const AIR: Self = Self(0);

    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

/// Shape a block type is rendered with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryHint {
    /// Axis-aligned unit cube.
    #[default]
    Cube,
    /// Two crossed vertical planes (plants, decorations).
    Sprite,
}

/// Texture reference(s) for a block type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockTextures {
    /// No texture was provided; renderers substitute the error texture.
    #[default]
    Missing,
    /// One texture on every face.
    Single(String),
    /// Per-face overrides, indexed by [`FaceDirection::index`], falling back to `base`.
    PerFace {
        base: String,
        faces: [Option<String>; 6],
    },
}

impl BlockTextures {
    /// The texture reference used on `face`, if any.
    pub fn for_face(&self, face: FaceDirection) -> Option<&str> {
        match self {
            BlockTextures::Missing => None,
            BlockTextures::Single(uri) => Some(uri.as_str()),
            BlockTextures::PerFace { base, faces } => {
                Some(faces[face.index()].as_deref().unwrap_or(base.as_str()))
            }
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, BlockTextures::PerFace { .. })
    }
}

/// Full descriptor for a block type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockTypeDef {
    pub id: BlockTypeId,
    /// Human-readable name (e.g. "stone", "grass", "water").
    pub name: String,
    /// User-supplied type rather than one shipped with the editor.
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub textures: BlockTextures,
    #[serde(default)]
    pub geometry: GeometryHint,
    /// See-through types never cull neighbour faces or occlude chunks.
    #[serde(default)]
    pub transparent: bool,
}

impl BlockTypeDef {
    /// Opaque cube with a single texture.
    pub fn cube(id: u16, name: &str, texture: &str) -> Self {
        Self {
            id: BlockTypeId(id),
            name: name.to_string(),
            is_custom: false,
            textures: BlockTextures::Single(texture.to_string()),
            geometry: GeometryHint::Cube,
            transparent: false,
        }
    }

    /// Whether this type blocks sight lines and hides adjacent faces.
    pub fn is_opaque(&self) -> bool {
        !self.transparent && self.geometry == GeometryHint::Cube
    }
}

/// Errors that can occur during block type registration.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Id 0 is air and cannot carry a definition.
    #[error("block type id 0 is reserved for air")]
    ReservedId,
    /// Another type already uses this id.
    #[error("duplicate block type id: {0}")]
    DuplicateId(u16),
    /// A type with the same name has already been registered.
    #[error("duplicate block type name: {0}")]
    DuplicateName(String),
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Keyed store of [`BlockTypeDef`] with O(1) lookup by id and by name.
#[derive(Clone, Debug, Default)]
pub struct BlockTypeCatalog {
    types: FxHashMap<BlockTypeId, BlockTypeDef>,
    name_to_id: FxHashMap<String, BlockTypeId>,
}

impl BlockTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a list of definitions.
    ///
    /// # Errors
    ///
    /// Fails on the first definition [`register`](Self::register) rejects.
    pub fn from_defs(defs: impl IntoIterator<Item = BlockTypeDef>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for def in defs {
            catalog.register(def)?;
        }
        Ok(catalog)
    }

    /// Registers a new block type under its own id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ReservedId`] for id 0, and
    /// [`CatalogError::DuplicateId`] / [`CatalogError::DuplicateName`] when
    /// either key is already taken.
    pub fn register(&mut self, def: BlockTypeDef) -> Result<BlockTypeId, CatalogError> {
        if def.id.is_air() {
            return Err(CatalogError::ReservedId);
        }
        if self.types.contains_key(&def.id) {
            return Err(CatalogError::DuplicateId(def.id.0));
        }
        if self.name_to_id.contains_key(&def.name) {
            return Err(CatalogError::DuplicateName(def.name));
        }
        let id = def.id;
        self.name_to_id.insert(def.name.clone(), id);
        self.types.insert(id, def);
        Ok(id)
    }

    pub fn get(&self, id: BlockTypeId) -> Option<&BlockTypeDef> {
        self.types.get(&id)
    }

    /// Returns the ID for a named block type, or `None` if not found.
    pub fn lookup_by_name(&self, name: &str) -> Option<BlockTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Whether blocks of this type stop occlusion rays and cull neighbour faces.
    ///
    /// Air and unknown ids are treated as see-through.
    pub fn is_opaque(&self, id: BlockTypeId) -> bool {
        self.types.get(&id).is_some_and(BlockTypeDef::is_opaque)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates definitions in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockTypeDef> {
        let mut defs: Vec<_> = self.types.values().collect();
        defs.sort_by_key(|d| d.id);
        defs.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> BlockTypeCatalog {
        let mut glass = BlockTypeDef::cube(20, "glass", "blocks/glass.png");
        glass.transparent = true;
        let mut flower = BlockTypeDef::cube(30, "flower", "blocks/flower.png");
        flower.geometry = GeometryHint::Sprite;
        BlockTypeCatalog::from_defs([
            BlockTypeDef::cube(1, "stone", "blocks/stone.png"),
            glass,
            flower,
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let cat = catalog();
        assert_eq!(cat.len(), 3);
        assert_eq!(cat.lookup_by_name("glass"), Some(BlockTypeId(20)));
        assert_eq!(cat.get(BlockTypeId(1)).unwrap().name, "stone");
        assert!(cat.get(BlockTypeId(2)).is_none());
    }

    #[test]
    fn test_air_id_rejected() {
        let mut cat = BlockTypeCatalog::new();
        let err = cat.register(BlockTypeDef::cube(0, "air", "x")).unwrap_err();
        assert!(matches!(err, CatalogError::ReservedId));
    }

    #[test]
    fn test_duplicate_id_and_name_rejected() {
        let mut cat = catalog();
        assert!(matches!(
            cat.register(BlockTypeDef::cube(1, "granite", "x")),
            Err(CatalogError::DuplicateId(1))
        ));
        assert!(matches!(
            cat.register(BlockTypeDef::cube(2, "stone", "x")),
            Err(CatalogError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_opacity_excludes_air_transparent_and_sprites() {
        let cat = catalog();
        assert!(cat.is_opaque(BlockTypeId(1)));
        assert!(!cat.is_opaque(BlockTypeId::AIR));
        assert!(!cat.is_opaque(BlockTypeId(20)));
        assert!(!cat.is_opaque(BlockTypeId(30)));
        assert!(!cat.is_opaque(BlockTypeId(999)));
    }

    #[test]
    fn test_per_face_textures_fall_back_to_base() {
        let mut faces: [Option<String>; 6] = Default::default();
        faces[FaceDirection::PosY.index()] = Some("grass_top.png".to_string());
        let tex = BlockTextures::PerFace {
            base: "grass_side.png".to_string(),
            faces,
        };
        assert_eq!(tex.for_face(FaceDirection::PosY), Some("grass_top.png"));
        assert_eq!(tex.for_face(FaceDirection::NegX), Some("grass_side.png"));
        assert_eq!(BlockTextures::Missing.for_face(FaceDirection::PosY), None);
    }

    #[test]
    fn test_iter_is_sorted_by_id() {
        let ids: Vec<u16> = catalog().iter().map(|d| d.id.0).collect();
        assert_eq!(ids, vec![1, 20, 30]);
    }
}
