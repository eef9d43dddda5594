//! Immutable per-frame view of the configuration.

use std::time::Duration;

use tracing::warn;
use voxmap_config::Config;
use voxmap_mesh::MeshToggles;
use voxmap_spatial::{RaycastOptions, RebuildSettings};
use voxmap_voxel::{GroundPlacementPolicy, PlacementShape};

use crate::persistence::DEFAULT_SLOT;
use crate::visibility::VisibilitySettings;

/// Everything the terrain components read from [`Config`], converted to
/// their own types once so the frame loop never touches the raw config.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainSettings {
    pub chunk_size: i32,
    pub toggles: MeshToggles,
    pub occlusion_threshold: f32,
    pub visibility: VisibilitySettings,
    pub frame_budget: Duration,
    pub max_tasks_per_frame: usize,
    pub immediate_rebuild_limit: usize,
    pub index: RebuildSettings,
    pub rebuild_interval: Duration,
    pub bulk_batch_size: usize,
    pub raycast: RaycastOptions,
    pub placement_shape: PlacementShape,
    pub ground_placement: GroundPlacementPolicy,
    pub slot: String,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for TerrainSettings {
    fn from(config: &Config) -> Self {
        let chunk_size = if config.terrain.chunk_size > 0 {
            config.terrain.chunk_size
        } else {
            warn!(chunk_size = config.terrain.chunk_size, "invalid chunk size, using 16");
            16
        };
        let frame_budget = Duration::from_millis(config.scheduler.frame_budget_ms);
        let v = &config.visibility;

        let placement_shape = PlacementShape::from_name(&config.placement.shape)
            .unwrap_or_else(|| {
                warn!(shape = %config.placement.shape, "unknown placement shape, using single");
                PlacementShape::Single
            });
        let slot = if config.storage.slot.trim().is_empty() {
            DEFAULT_SLOT.to_string()
        } else {
            config.storage.slot.clone()
        };

        Self {
            chunk_size,
            toggles: MeshToggles {
                greedy: config.meshing.greedy_enabled,
                instancing: config.meshing.instancing_enabled,
            },
            occlusion_threshold: config.occlusion.threshold,
            visibility: VisibilitySettings {
                chunk_size,
                view_distance: config.terrain.view_distance,
                history_frames: v.history_frames.max(1),
                hide_delay: Duration::from_millis(v.hide_delay_ms),
                min_interval: Duration::from_millis(v.min_interval_ms),
                max_interval: Duration::from_millis(v.max_interval_ms.max(v.min_interval_ms)),
                slow_update: Duration::from_millis(v.slow_update_ms),
                backoff_factor: v.backoff_factor,
                recover_factor: v.recover_factor,
                adjacency_memo_cap: v.adjacency_memo_cap,
                prefetch_dot: v.prefetch_dot,
                adjacent_penalty: v.adjacent_penalty,
                prefetch_penalty: v.prefetch_penalty,
                max_builds_per_update: v.max_builds_per_update,
                occlusion_enabled: config.occlusion.enabled,
            },
            frame_budget,
            max_tasks_per_frame: config.scheduler.max_tasks_per_frame.max(1),
            immediate_rebuild_limit: config.scheduler.immediate_rebuild_limit,
            index: RebuildSettings {
                large_map_threshold: config.index.large_map_threshold,
                batch_size: config.index.batch_size,
                time_budget: frame_budget,
            },
            rebuild_interval: Duration::from_millis(config.index.rebuild_interval_ms),
            bulk_batch_size: config.loading.bulk_batch_size,
            raycast: RaycastOptions {
                max_distance: config.raycast.max_selection_distance,
                grid_size: config.terrain.grid_size as f32,
                use_spatial_hash: config.raycast.use_spatial_hash,
            },
            placement_shape,
            ground_placement: GroundPlacementPolicy {
                check_radius: config.placement.ground_check_radius,
                min_clearance: config.placement.ground_min_clearance,
            },
            slot,
        }
    }
}
