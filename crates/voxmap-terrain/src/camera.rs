//! Read-only camera state handed to the terrain each frame.

use std::time::Duration;

use glam::{Mat4, Vec3};
use voxmap_core::Frustum;
use voxmap_spatial::Ray;

/// One frame's camera: where it is, where it looks, and its matrices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub position: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
    pub view: Mat4,
    /// Standard `[0, 1]` depth perspective.
    pub projection: Mat4,
}

impl CameraSnapshot {
    /// Perspective camera at `position` looking at `target`.
    pub fn look_at(
        position: Vec3,
        target: Vec3,
        fov_y: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let forward = (target - position).try_normalize().unwrap_or(Vec3::NEG_Z);
        Self {
            position,
            forward,
            view: Mat4::look_to_rh(position, forward, Vec3::Y),
            projection: Mat4::perspective_rh(fov_y, aspect_ratio, near, far),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }

    /// Ray through the centre of the view.
    pub fn center_ray(&self) -> Option<Ray> {
        Ray::new(self.position, self.forward)
    }

    /// Ray through a point given in normalized device coordinates.
    pub fn ray_through_ndc(&self, ndc_x: f32, ndc_y: f32) -> Option<Ray> {
        let inv = self.view_projection().inverse();
        let far = inv.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        Ray::new(self.position, far - self.position)
    }
}

/// Tracks whether the camera is moving, holding "moving" for a short linger
/// window after the last change so brief pauses do not toggle prefetching.
#[derive(Debug, Clone)]
pub struct CameraMotion {
    linger: Duration,
    last: Option<(Vec3, Vec3)>,
    last_change: Option<Duration>,
}

impl CameraMotion {
    const POSITION_EPSILON: f32 = 1e-4;
    const DIRECTION_EPSILON: f32 = 1e-5;

    pub fn new(linger: Duration) -> Self {
        Self {
            linger,
            last: None,
            last_change: None,
        }
    }

    /// Records `camera` and returns whether it counts as moving at `now`.
    pub fn observe(&mut self, now: Duration, camera: &CameraSnapshot) -> bool {
        let current = (camera.position, camera.forward);
        if let Some((position, forward)) = self.last
            && (position.distance_squared(current.0) > Self::POSITION_EPSILON
                || 1.0 - forward.dot(current.1) > Self::DIRECTION_EPSILON)
        {
            self.last_change = Some(now);
        }
        self.last = Some(current);
        self.is_moving(now)
    }

    pub fn is_moving(&self, now: Duration) -> bool {
        self.last_change
            .is_some_and(|at| now.saturating_sub(at) <= self.linger)
    }
}

impl Default for CameraMotion {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}
