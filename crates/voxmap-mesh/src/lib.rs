//! Chunk meshing: greedy, instanced, and individual tiers with fallback,
//! plus the shared geometry and material caches they draw from.

pub mod atlas;
pub mod builder;
pub mod cache;
pub mod greedy;
pub mod individual;
pub mod instanced;
pub mod mesh_set;
pub mod surface;

pub use atlas::{GridAtlas, TextureAtlas, UvRect};
pub use builder::{MeshBuildError, MeshBuilder, MeshOutput, MeshToggles};
pub use cache::{Geometry, GeometryCache, Material, MaterialCache};
pub use greedy::greedy_mesh;
pub use individual::{Primitive, individual_primitives};
pub use instanced::{InstanceBatch, instance_batches};
pub use mesh_set::{DisposeReport, MeshSet, MeshTier};
pub use surface::{QuadInfo, Surface, SurfaceBuffers, SurfaceVertex};
