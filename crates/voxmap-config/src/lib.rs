//! Configuration for the voxmap terrain core.
//!
//! Settings persist to disk as a RON file with per-section defaults, so old
//! files keep loading as fields are added. CLI flags override a subset.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE_NAME, Config, DebugConfig, IndexConfig, LoadingConfig, MeshingConfig,
    OcclusionConfig, PlacementConfig, RaycastConfig, SchedulerConfig, StorageConfig,
    TerrainConfig, VisibilityConfig, default_config_dir, resolve_config_dir,
};
pub use error::ConfigError;
