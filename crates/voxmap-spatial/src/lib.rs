//! Query structures over the block field.
//!
//! [`ChunkIndex`] mirrors the field for O(1) point lookups and chunk-scoped
//! iteration, and carries the chunk occlusion heuristic. [`RaycastEngine`]
//! answers picking rays against the index, the field, and the ground plane.

pub mod index;
pub mod occlusion;
pub mod raycast;
pub mod rebuild;
pub mod walk;

pub use index::ChunkIndex;
pub use raycast::{Ray, RaycastContext, RaycastEngine, RaycastHit, RaycastOptions};
pub use rebuild::{IndexRebuild, RebuildOutcome, RebuildSettings, RebuildThrottle, ThrottleDecision};
pub use walk::{GridStep, GridWalk};
