//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Chunking and world extents.
    pub terrain: TerrainConfig,
    /// Mesh tier toggles.
    pub meshing: MeshingConfig,
    /// Whole-chunk occlusion culling.
    pub occlusion: OcclusionConfig,
    /// Visibility tracker tuning.
    pub visibility: VisibilityConfig,
    /// Build queue time slicing.
    pub scheduler: SchedulerConfig,
    /// Spatial index rebuilds.
    pub index: IndexConfig,
    /// Bulk map loading.
    pub loading: LoadingConfig,
    /// Block picking.
    pub raycast: RaycastConfig,
    /// Edit brush and ground placement.
    pub placement: PlacementConfig,
    /// Map persistence.
    pub storage: StorageConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Chunk edge length in blocks.
    pub chunk_size: i32,
    /// Distance in blocks within which chunks are considered for display.
    pub view_distance: f32,
    /// Edge length of the square ground plane centred on the origin.
    pub grid_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeshingConfig {
    pub greedy_enabled: bool,
    pub instancing_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcclusionConfig {
    pub enabled: bool,
    /// Blocked sample fraction above which a chunk counts as occluded.
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Frames of visibility history kept per update.
    pub history_frames: usize,
    /// Milliseconds a chunk stays shown after it stops being requested.
    pub hide_delay_ms: u64,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    /// Updates slower than this lengthen the interval.
    pub slow_update_ms: u64,
    pub backoff_factor: f32,
    pub recover_factor: f32,
    pub adjacency_memo_cap: usize,
    /// Minimum dot product between view direction and chunk direction for a
    /// speculative build while the camera moves.
    pub prefetch_dot: f32,
    pub adjacent_penalty: f32,
    pub prefetch_penalty: f32,
    pub max_builds_per_update: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time spent on chunk builds per frame.
    pub frame_budget_ms: u64,
    pub max_tasks_per_frame: usize,
    /// Chunks an edit rebuilds immediately; the rest are queued.
    pub immediate_rebuild_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Maps larger than this rebuild the index in batches.
    pub large_map_threshold: usize,
    pub batch_size: usize,
    /// Minimum time between two full rebuilds.
    pub rebuild_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoadingConfig {
    pub bulk_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RaycastConfig {
    pub max_selection_distance: f32,
    /// Walk the spatial index instead of testing block boxes.
    pub use_spatial_hash: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlacementConfig {
    /// Brush footprint: single, cross, diamond, square9 or square16.
    pub shape: String,
    pub ground_check_radius: f32,
    pub ground_min_clearance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Slot the map is loaded from and saved to.
    pub slot: String,
    /// Directory holding slot files. `None` uses the platform data dir.
    pub directory: Option<PathBuf>,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log a stats line every this many frames (0 = never).
    pub stats_every_frames: u32,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            view_distance: 256.0,
            grid_size: 100,
        }
    }
}

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            greedy_enabled: true,
            instancing_enabled: true,
        }
    }
}

impl Default for OcclusionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.7,
        }
    }
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            history_frames: 15,
            hide_delay_ms: 500,
            min_interval_ms: 100,
            max_interval_ms: 500,
            slow_update_ms: 16,
            backoff_factor: 1.1,
            recover_factor: 0.95,
            adjacency_memo_cap: 10_000,
            prefetch_dot: 0.3,
            adjacent_penalty: 5.0,
            prefetch_penalty: 10.0,
            max_builds_per_update: 5,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_budget_ms: 20,
            max_tasks_per_frame: 8,
            immediate_rebuild_limit: 3,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            large_map_threshold: 100_000,
            batch_size: 50_000,
            rebuild_interval_ms: 1_000,
        }
    }
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            bulk_batch_size: 50_000,
        }
    }
}

impl Default for RaycastConfig {
    fn default() -> Self {
        Self {
            max_selection_distance: 256.0,
            use_spatial_hash: true,
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            shape: "single".to_string(),
            ground_check_radius: 3.0,
            ground_min_clearance: 2.0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            slot: "current".to_string(),
            directory: None,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_every_frames: 0,
        }
    }
}

/// File name of the config inside its directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Platform config directory for voxmap, e.g. `~/.config/voxmap`.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("voxmap"))
}

/// The directory given on the command line, else the platform default.
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    explicit
        .map(Path::to_path_buf)
        .or_else(default_config_dir)
        .ok_or(ConfigError::NoConfigDir)
}

impl StorageConfig {
    /// Directory slot files live in.
    pub fn resolved_directory(&self) -> Option<PathBuf> {
        self.directory
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("voxmap").join("maps")))
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Reads `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }
        let config = Self::read_file(&path)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Writes `config.ron` into `config_dir`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        let path = config_dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, serialized).map_err(|source| ConfigError::Write { path, source })
    }

    /// Re-reads the file. Returns `Some` only when it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read_file(&config_dir.join(CONFIG_FILE_NAME))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Config changed on disk");
        Ok(Some(fresh))
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
