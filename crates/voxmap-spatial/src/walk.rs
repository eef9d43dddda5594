//! Grid traversal using the DDA (Amanatides & Woo) algorithm.
//!
//! Visits every unit cell a ray passes through, in order, reporting the
//! parametric distance at which the ray entered the cell and the normal of
//! the face it crossed to get there. Used by picking and by the occlusion
//! sampler.

use glam::{IVec3, Vec3};
use voxmap_core::BlockPos;

/// One cell visited by a [`GridWalk`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridStep {
    pub cell: BlockPos,
    /// Distance along the ray at which the cell was entered.
    pub t: f32,
    /// Normal of the entry face; zero for the starting cell.
    pub normal: IVec3,
}

/// Iterator over the cells a ray crosses, up to `max_t`.
#[derive(Clone, Debug)]
pub struct GridWalk {
    cell: IVec3,
    step: IVec3,
    t_delta: Vec3,
    t_max: Vec3,
    t: f32,
    normal: IVec3,
    max_t: f32,
    started: bool,
}

impl GridWalk {
    /// `direction` must be normalized; `max_t` is in world units.
    pub fn new(origin: Vec3, direction: Vec3, max_t: f32) -> Self {
        let cell = origin.floor().as_ivec3();
        let sub = origin - origin.floor();

        let step = IVec3::new(
            if direction.x >= 0.0 { 1 } else { -1 },
            if direction.y >= 0.0 { 1 } else { -1 },
            if direction.z >= 0.0 { 1 } else { -1 },
        );

        // Distance in t-units to cross one full cell on each axis.
        let t_delta = Vec3::new(
            safe_inv(direction.x.abs()),
            safe_inv(direction.y.abs()),
            safe_inv(direction.z.abs()),
        );

        // Distance in t-units to the first cell boundary on each axis.
        let t_max = Vec3::new(
            initial_t_max(sub.x, direction.x, t_delta.x),
            initial_t_max(sub.y, direction.y, t_delta.y),
            initial_t_max(sub.z, direction.z, t_delta.z),
        );

        Self {
            cell,
            step,
            t_delta,
            t_max,
            t: 0.0,
            normal: IVec3::ZERO,
            max_t,
            started: false,
        }
    }
}

impl Iterator for GridWalk {
    type Item = GridStep;

    fn next(&mut self) -> Option<GridStep> {
        if !self.started {
            self.started = true;
            return Some(GridStep {
                cell: BlockPos::from(self.cell),
                t: 0.0,
                normal: IVec3::ZERO,
            });
        }

        // Advance along the axis with the smallest t_max.
        if self.t_max.x < self.t_max.y && self.t_max.x < self.t_max.z {
            self.t = self.t_max.x;
            self.t_max.x += self.t_delta.x;
            self.cell.x += self.step.x;
            self.normal = IVec3::new(-self.step.x, 0, 0);
        } else if self.t_max.y < self.t_max.z {
            self.t = self.t_max.y;
            self.t_max.y += self.t_delta.y;
            self.cell.y += self.step.y;
            self.normal = IVec3::new(0, -self.step.y, 0);
        } else {
            self.t = self.t_max.z;
            self.t_max.z += self.t_delta.z;
            self.cell.z += self.step.z;
            self.normal = IVec3::new(0, 0, -self.step.z);
        }

        if self.t > self.max_t {
            return None;
        }
        Some(GridStep {
            cell: BlockPos::from(self.cell),
            t: self.t,
            normal: self.normal,
        })
    }
}

/// Safely compute 1.0 / x, clamping to `f32::MAX` when x ≈ 0.
fn safe_inv(x: f32) -> f32 {
    if x.abs() < f32::EPSILON {
        f32::MAX
    } else {
        1.0 / x
    }
}

/// Compute the initial parametric distance to the first cell boundary.
fn initial_t_max(sub: f32, dir_component: f32, t_delta: f32) -> f32 {
    if dir_component > 0.0 {
        (1.0 - sub) * t_delta
    } else if dir_component < 0.0 {
        sub * t_delta
    } else {
        f32::MAX
    }
}
