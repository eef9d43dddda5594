//! Picking rays against the block field and the ground plane.
//!
//! Two block strategies exist. The grid march walks cell boundaries through
//! the [`ChunkIndex`] and is the normal path. The box test intersects block
//! AABBs in the chunks ahead of the ray straight from the [`VoxelField`],
//! and is used when the index is switched off or missing.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::{IVec3, Vec3};
use rustc_hash::FxHashSet;
use tracing::warn;
use voxmap_core::{Aabb, BlockPos};
use voxmap_voxel::{BlockTypeId, VoxelField};

use crate::index::ChunkIndex;
use crate::walk::GridWalk;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A half-line with a unit-length direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Normalizes `direction`. Returns `None` for a zero or non-finite direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        Some(Self {
            origin,
            direction: direction.try_normalize()?,
        })
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastOptions {
    /// Hits farther than this are ignored.
    pub max_distance: f32,
    /// Edge length of the square ground plane centred on the origin.
    pub grid_size: f32,
    /// Use the grid march through the index instead of the box test.
    pub use_spatial_hash: bool,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            max_distance: 256.0,
            grid_size: 100.0,
            use_spatial_hash: true,
        }
    }
}

/// Borrowed world state a cast runs against.
#[derive(Clone, Copy)]
pub struct RaycastContext<'a> {
    pub field: &'a VoxelField,
    pub index: Option<&'a ChunkIndex>,
    /// Blocks to ignore, typically the ones placed earlier in the same gesture.
    pub exclude: &'a FxHashSet<BlockPos>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    pub point: Vec3,
    /// Outward normal of the face that was hit.
    pub normal: IVec3,
    pub distance: f32,
    pub block: BlockPos,
    /// `None` for ground hits.
    pub block_id: Option<BlockTypeId>,
    pub is_ground: bool,
}

impl RaycastHit {
    /// Cell adjacent to the hit face, where a new block would be placed.
    pub fn adjacent(&self) -> BlockPos {
        if self.is_ground {
            return self.block;
        }
        self.block.offset(self.normal.x, self.normal.y, self.normal.z)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RaycastEngine {
    options: RaycastOptions,
    warned_missing_index: AtomicBool,
}

impl RaycastEngine {
    pub fn new(options: RaycastOptions) -> Self {
        Self {
            options,
            warned_missing_index: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &RaycastOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RaycastOptions) {
        self.options = options;
    }

    /// Returns the nearest of the block hit and the ground hit.
    pub fn cast(&self, ray: &Ray, ctx: &RaycastContext<'_>) -> Option<RaycastHit> {
        let block_hit = match (self.options.use_spatial_hash, ctx.index) {
            (true, Some(index)) => self.march(ray, index, ctx.exclude),
            (true, None) => {
                if !self.warned_missing_index.swap(true, Ordering::Relaxed) {
                    warn!("raycast requested without a spatial index; using box test");
                }
                self.box_test(ray, ctx.field, ctx.exclude)
            }
            (false, _) => self.box_test(ray, ctx.field, ctx.exclude),
        };
        let ground_hit = self.ground(ray);

        match (block_hit, ground_hit) {
            (Some(b), Some(g)) => Some(if g.distance < b.distance { g } else { b }),
            (b, g) => b.or(g),
        }
    }

    /// Walks cell boundaries and stops at the first indexed block.
    fn march(
        &self,
        ray: &Ray,
        index: &ChunkIndex,
        exclude: &FxHashSet<BlockPos>,
    ) -> Option<RaycastHit> {
        for step in GridWalk::new(ray.origin, ray.direction, self.options.max_distance) {
            if exclude.contains(&step.cell) {
                continue;
            }
            let Some(id) = index.get_block(step.cell) else {
                continue;
            };
            let normal = if step.normal == IVec3::ZERO {
                facing_normal(ray.direction)
            } else {
                step.normal
            };
            return Some(RaycastHit {
                point: ray.at(step.t),
                normal,
                distance: step.t,
                block: step.cell,
                block_id: Some(id),
                is_ground: false,
            });
        }
        None
    }

    /// Exact slab tests against blocks in chunks ahead of the ray.
    fn box_test(
        &self,
        ray: &Ray,
        field: &VoxelField,
        exclude: &FxHashSet<BlockPos>,
    ) -> Option<RaycastHit> {
        let size = field.chunk_size();
        let reach = self.options.max_distance + (size as f32) * 3f32.sqrt();
        let origin_chunk = BlockPos::containing(ray.origin).chunk(size);

        let mut best: Option<RaycastHit> = None;
        for key in field.chunk_keys() {
            let to_chunk = key.center(size) - ray.origin;
            let ahead = key == origin_chunk || to_chunk.dot(ray.direction) > 0.0;
            if !ahead || to_chunk.length() > reach {
                continue;
            }
            let Some(chunk) = field.chunk(key) else {
                continue;
            };
            for (pos, id) in chunk.iter() {
                if exclude.contains(&pos) {
                    continue;
                }
                let aabb = Aabb::new(pos.min_corner(), pos.min_corner() + Vec3::ONE);
                let Some((t, axis)) = aabb.ray_intersection(ray.origin, ray.direction) else {
                    continue;
                };
                if t > self.options.max_distance || best.is_some_and(|b| b.distance <= t) {
                    continue;
                }
                let normal = match axis {
                    Some(a) => {
                        let mut n = IVec3::ZERO;
                        n[a] = if ray.direction[a] > 0.0 { -1 } else { 1 };
                        n
                    }
                    None => facing_normal(ray.direction),
                };
                best = Some(RaycastHit {
                    point: ray.at(t),
                    normal,
                    distance: t,
                    block: pos,
                    block_id: Some(id),
                    is_ground: false,
                });
            }
        }
        best
    }

    /// Intersection with the `y = 0` plane, bounded to the editing grid.
    fn ground(&self, ray: &Ray) -> Option<RaycastHit> {
        if ray.direction.y.abs() < f32::EPSILON {
            return None;
        }
        let t = -ray.origin.y / ray.direction.y;
        if t <= 0.0 || t >= self.options.max_distance {
            return None;
        }
        let point = ray.at(t);
        let half = self.options.grid_size * 0.5;
        if point.x.abs() > half || point.z.abs() > half {
            return None;
        }
        Some(RaycastHit {
            point,
            normal: IVec3::Y,
            distance: t,
            block: BlockPos::new(point.x.floor() as i32, 0, point.z.floor() as i32),
            block_id: None,
            is_ground: true,
        })
    }
}

/// Normal facing back along the dominant axis of `direction`.
fn facing_normal(direction: Vec3) -> IVec3 {
    let abs = direction.abs();
    let axis = if abs.x >= abs.y && abs.x >= abs.z {
        0
    } else if abs.y >= abs.z {
        1
    } else {
        2
    };
    let mut n = IVec3::ZERO;
    n[axis] = if direction[axis] > 0.0 { -1 } else { 1 };
    n
}
