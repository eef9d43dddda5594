//! Headless driver for the voxmap terrain pipeline.
//!
//! Loads the configured map slot (or generates one), then runs frames with an
//! orbiting camera until the build queue settles, stamping a few edits along
//! the way, and reports what the pipeline did.

mod generate;

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::Vec3;
use tracing::{error, info, warn};
use voxmap_config::{CliArgs, Config, resolve_config_dir};
use voxmap_core::SystemClock;
use voxmap_mesh::GridAtlas;
use voxmap_terrain::{
    CameraSnapshot, HeadlessScene, MemoryStore, RonFileStore, TerrainSettings, TerrainStore,
    TerrainSystem,
};
use voxmap_voxel::{BlockTypeCatalog, BlockTypeDef, BlockTypeId, GeometryHint};

use crate::generate::{Heightfield, HeightfieldParams};

const FRAME_TIME: Duration = Duration::from_millis(16);
const GLOW: BlockTypeId = BlockTypeId(4);
/// Consecutive idle frames after which the run counts as settled.
const SETTLE_FRAMES: u32 = 120;

fn catalog() -> BlockTypeCatalog {
    let mut flower = BlockTypeDef::cube(5, "flower", "flower.png");
    flower.geometry = GeometryHint::Sprite;
    flower.transparent = true;

    let defs = [
        BlockTypeDef::cube(1, "stone", "stone.png"),
        BlockTypeDef::cube(2, "dirt", "dirt.png"),
        BlockTypeDef::cube(3, "grass", "grass.png"),
        BlockTypeDef::cube(4, "glow", "glow.png"),
        flower,
    ];
    BlockTypeCatalog::from_defs(defs).unwrap_or_else(|e| {
        error!("Built-in block catalog is invalid: {e}");
        BlockTypeCatalog::new()
    })
}

fn orbit_camera(frame: u32, radius: f32, height: f32) -> CameraSnapshot {
    let angle = frame as f32 / 600.0 * TAU;
    let position = Vec3::new(angle.cos() * radius, height, angle.sin() * radius);
    CameraSnapshot::look_at(position, Vec3::ZERO, 60f32.to_radians(), 16.0 / 9.0, 0.1, 2000.0)
}

fn open_store(config: &Config) -> Box<dyn TerrainStore> {
    match config.storage.resolved_directory() {
        Some(dir) => {
            info!(dir = %dir.display(), "using map directory");
            Box::new(RonFileStore::new(dir))
        }
        None => {
            warn!("no data directory available, maps will not persist");
            Box::new(MemoryStore::new())
        }
    }
}

fn main() {
    let args = CliArgs::parse();

    let config_dir = resolve_config_dir(args.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("{e}, using ./.voxmap");
        PathBuf::from(".voxmap")
    });

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    voxmap_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let settings = TerrainSettings::from(&config);
    let catalog = catalog();
    let atlas = GridAtlas::from_catalog(&catalog);
    let clock = Arc::new(SystemClock::new());
    let mut terrain = TerrainSystem::new(settings, catalog, atlas, HeadlessScene::new(), clock)
        .with_store(open_store(&config));

    match terrain.load_from_store() {
        Ok(true) => {}
        Ok(false) => {
            let field = Heightfield::new(HeightfieldParams::default());
            let blocks = field.blocks(args.blocks);
            info!(blocks = blocks.len(), "generated map");
            terrain.begin_bulk_load(blocks);
        }
        Err(e) => {
            error!("Failed to load map slot: {e}");
            std::process::exit(1);
        }
    }

    let radius = (args.blocks as f32).sqrt().max(32.0);
    let stats_every = config.debug.stats_every_frames;
    let started = Instant::now();
    let mut built = 0;
    let mut edits = 0;
    let mut idle = 0;
    let mut frames_run = 0;

    for frame in 0..args.frames {
        frames_run = frame + 1;
        let frame_start = Instant::now();
        let camera = orbit_camera(frame, radius, radius * 0.5);
        let report = terrain.frame(&camera);
        built += report.slice.processed - report.slice.failed;

        // Stamp a glow block wherever the camera looks every few seconds.
        if frame % 180 == 90
            && !terrain.is_loading()
            && let Some(ray) = camera.center_ray()
            && let Some(hit) = terrain.pick(&ray)
        {
            let shape = terrain.settings().placement_shape;
            let edit = terrain.place_shape(hit.adjacent(), shape, GLOW, hit.is_ground);
            edits += edit.touched.len();
            info!(
                pos = %hit.adjacent(),
                rebuilt = edit.rebuilt,
                queued = edit.queued,
                "placed blocks"
            );
        }

        if stats_every > 0 && frame % stats_every == 0 {
            let stats = terrain.stats();
            info!(
                frame,
                blocks = stats.blocks,
                chunks = stats.chunks,
                attached = stats.attached,
                queued = stats.queued,
                loading = stats.loading,
                "terrain stats"
            );
        }

        let settled = !terrain.is_loading() && terrain.stats().queued == 0;
        idle = if settled { idle + 1 } else { 0 };
        if idle >= SETTLE_FRAMES {
            info!(frame, "terrain settled");
            break;
        }

        if let Some(rest) = FRAME_TIME.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let stats = terrain.stats();
    info!(
        frames = frames_run,
        elapsed = ?started.elapsed(),
        blocks = stats.blocks,
        chunks = stats.chunks,
        indexed = stats.indexed,
        meshes = stats.meshes,
        attached = stats.attached,
        queued = stats.queued,
        triangles = stats.triangles,
        draw_calls = terrain.scene().draw_calls(),
        built,
        edits,
        "run finished"
    );
}
