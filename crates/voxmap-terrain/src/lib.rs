//! The terrain side of the voxel map editor.
//!
//! [`TerrainSystem`] ties the block field, the spatial index, the mesh
//! builder and the visibility tracker into one per-frame pipeline. Rendering
//! and storage are reached through the [`SceneGraph`] and [`TerrainStore`]
//! traits so the whole pipeline also runs headless.

pub mod camera;
pub mod persistence;
pub mod scene;
pub mod scheduler;
pub mod settings;
pub mod system;
pub mod visibility;

pub use camera::{CameraMotion, CameraSnapshot};
pub use persistence::{BlockMap, DEFAULT_SLOT, MemoryStore, RonFileStore, StoreError, TerrainStore};
pub use scene::{AttachedMesh, HeadlessScene, SceneGraph};
pub use scheduler::{BuildScheduler, BuildTask, EDIT_PRIORITY, SliceReport};
pub use settings::TerrainSettings;
pub use system::{BlockEdit, ChunkBuild, EditReport, FrameReport, TerrainStats, TerrainSystem};
pub use visibility::{
    BuildRequest, ChunkSource, IndexOcclusion, OcclusionQuery, VisibilityContext,
    VisibilitySettings, VisibilityTracker, VisibilityUpdate,
};
