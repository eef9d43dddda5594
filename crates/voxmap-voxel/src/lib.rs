//! Block storage for the voxmap terrain core.
//!
//! [`VoxelField`] is the sparse, chunk-partitioned source of truth. Edits
//! return the chunk keys they touched so callers can schedule rebuilds, and
//! whole-map replacement runs as a resumable [`BulkLoad`].

pub mod bulk;
pub mod catalog;
pub mod chunk;
pub mod field;
pub mod placement;
pub mod snapshot;

pub use bulk::{BulkLoad, DEFAULT_BULK_BATCH};
pub use catalog::{
    BlockTextures, BlockTypeCatalog, BlockTypeDef, BlockTypeId, CatalogError, GeometryHint,
};
pub use chunk::ChunkRecord;
pub use field::{TouchedChunks, VoxelField};
pub use placement::{GroundPlacementPolicy, PlacementShape};
pub use snapshot::ChunkSnapshot;
