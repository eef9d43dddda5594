//! Shared vocabulary for the voxmap terrain core: block and chunk keys,
//! neighbour offsets, frustum math, an injectable clock, and the resumable
//! task primitives used to time-slice long-running work.

pub mod clock;
pub mod frustum;
pub mod neighbors;
pub mod pos;
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use frustum::{Aabb, Frustum};
pub use neighbors::{CORNER_OFFSETS, EDGE_OFFSETS, FACE_OFFSETS, FaceDirection, NEIGHBOR_OFFSETS};
pub use pos::{BlockPos, ChunkKey};
pub use task::{BatchBudget, StepReport, TaskStatus};
