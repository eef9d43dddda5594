//! Named-slot storage for whole block maps.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use voxmap_core::BlockPos;
use voxmap_voxel::{BlockTypeId, VoxelField};

/// Slot used when none is configured.
pub const DEFAULT_SLOT: &str = "current";

/// Errors from a [`TerrainStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to read a slot from disk.
    #[error("failed to read slot: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write a slot to disk.
    #[error("failed to write slot: {0}")]
    WriteError(#[source] std::io::Error),

    /// Stored RON could not be parsed.
    #[error("failed to parse slot: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// The map could not be serialized.
    #[error("failed to serialize slot: {0}")]
    SerializeError(#[source] ron::Error),

    /// Slot names are limited to ASCII letters, digits, `-` and `_`.
    #[error("invalid slot name {0:?}")]
    InvalidSlot(String),
}

/// Serialized form of a map: every non-air block, sorted by position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockMap {
    pub blocks: Vec<(BlockPos, BlockTypeId)>,
}

impl BlockMap {
    pub fn from_field(field: &VoxelField) -> Self {
        let mut blocks: Vec<_> = field.iter().collect();
        blocks.sort_unstable_by_key(|&(pos, _)| pos);
        Self { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Key-value persistence keyed by slot name.
pub trait TerrainStore {
    fn load(&self, slot: &str) -> Result<Option<BlockMap>, StoreError>;
    fn save(&mut self, slot: &str, map: &BlockMap) -> Result<(), StoreError>;
}

/// In-memory store, mostly for tests and the headless driver.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: FxHashMap<String, BlockMap>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl TerrainStore for MemoryStore {
    fn load(&self, slot: &str) -> Result<Option<BlockMap>, StoreError> {
        Ok(self.slots.get(slot).cloned())
    }

    fn save(&mut self, slot: &str, map: &BlockMap) -> Result<(), StoreError> {
        self.slots.insert(slot.to_string(), map.clone());
        self.saves += 1;
        Ok(())
    }
}

/// One `<slot>.ron` file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct RonFileStore {
    dir: PathBuf,
}

impl RonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, slot: &str) -> Result<PathBuf, StoreError> {
        let valid = !slot.is_empty()
            && slot
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidSlot(slot.to_string()));
        }
        Ok(self.dir.join(format!("{slot}.ron")))
    }
}

impl TerrainStore for RonFileStore {
    fn load(&self, slot: &str) -> Result<Option<BlockMap>, StoreError> {
        let path = self.slot_path(slot)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(StoreError::ReadError)?;
        let map: BlockMap = ron::from_str(&contents).map_err(StoreError::ParseError)?;
        Ok(Some(map))
    }

    fn save(&mut self, slot: &str, map: &BlockMap) -> Result<(), StoreError> {
        let path = self.slot_path(slot)?;
        std::fs::create_dir_all(&self.dir).map_err(StoreError::WriteError)?;
        let serialized = ron::ser::to_string(map).map_err(StoreError::SerializeError)?;
        std::fs::write(&path, serialized).map_err(StoreError::WriteError)?;
        Ok(())
    }
}
