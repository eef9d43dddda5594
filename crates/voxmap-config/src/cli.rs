//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// voxmap command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "voxmap", about = "Headless voxel map terrain driver")]
pub struct CliArgs {
    /// Chunk edge length in blocks.
    #[arg(long)]
    pub chunk_size: Option<i32>,

    /// View distance in blocks.
    #[arg(long)]
    pub view_distance: Option<f32>,

    /// Enable or disable greedy meshing.
    #[arg(long)]
    pub greedy: Option<bool>,

    /// Enable or disable instanced meshing.
    #[arg(long)]
    pub instancing: Option<bool>,

    /// Enable or disable occlusion culling.
    #[arg(long)]
    pub occlusion: Option<bool>,

    /// Storage slot to load and save.
    #[arg(long)]
    pub slot: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Blocks in the generated map.
    #[arg(long, default_value_t = 150_000)]
    pub blocks: usize,

    /// Frames to run before reporting.
    #[arg(long, default_value_t = 600)]
    pub frames: u32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(size) = args.chunk_size {
            self.terrain.chunk_size = size;
        }
        if let Some(distance) = args.view_distance {
            self.terrain.view_distance = distance;
        }
        if let Some(greedy) = args.greedy {
            self.meshing.greedy_enabled = greedy;
        }
        if let Some(instancing) = args.instancing {
            self.meshing.instancing_enabled = instancing;
        }
        if let Some(occlusion) = args.occlusion {
            self.occlusion.enabled = occlusion;
        }
        if let Some(ref slot) = args.slot {
            self.storage.slot = slot.clone();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            chunk_size: Some(32),
            greedy: Some(false),
            slot: Some("backup".to_string()),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.terrain.chunk_size, 32);
        assert!(!config.meshing.greedy_enabled);
        assert_eq!(config.storage.slot, "backup");
        // Non-overridden fields retain defaults
        assert_eq!(config.terrain.view_distance, 256.0);
        assert!(config.meshing.instancing_enabled);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "voxmap",
            "--view-distance",
            "128",
            "--occlusion",
            "false",
            "--frames",
            "10",
        ]);
        assert_eq!(args.view_distance, Some(128.0));
        assert_eq!(args.occlusion, Some(false));
        assert_eq!(args.frames, 10);
        assert_eq!(args.blocks, 150_000);
    }
}
