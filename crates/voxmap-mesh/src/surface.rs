//! Vertex format and the triangle buffers produced by meshing.

use glam::Vec3;
use voxmap_core::FaceDirection;
use voxmap_voxel::BlockTypeId;

use crate::atlas::UvRect;

/// A single vertex, laid out for direct GPU upload.
///
/// `uv` is in tile units and grows past 1.0 across merged quads; the shader
/// wraps it into `uv_rect` (min.x, min.y, max.x, max.y) of the atlas.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SurfaceVertex {
    /// World-space position.
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub uv_rect: [f32; 4],
}

static_assertions::assert_eq_size!(SurfaceVertex, [u8; 48]);

/// Metadata for a single emitted quad.
#[derive(Clone, Copy, Debug)]
pub struct QuadInfo {
    pub direction: FaceDirection,
    /// Number of block faces merged into this quad.
    pub area: usize,
}

/// Indexed triangle list for one block type.
#[derive(Clone, Debug, Default)]
pub struct SurfaceBuffers {
    pub vertices: Vec<SurfaceVertex>,
    /// Triangles, 3 indices each.
    pub indices: Vec<u32>,
    pub quads: Vec<QuadInfo>,
}

impl SurfaceBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes one axis-aligned quad.
    ///
    /// `layer`, `u`, `v` are local cell coordinates along the direction's
    /// sweep axes; `w` and `h` are the extents along `u` and `v`. `origin`
    /// is added to every vertex.
    #[allow(clippy::too_many_arguments)]
    pub fn push_quad(
        &mut self,
        direction: FaceDirection,
        layer: usize,
        u: usize,
        v: usize,
        w: usize,
        h: usize,
        origin: Vec3,
        uv_rect: UvRect,
    ) {
        let (layer_axis, u_axis, v_axis) = direction.sweep_axes();
        let normal = direction.normal();

        // Positive faces sit on the far side of the cell.
        let layer_pos = if direction.is_positive() {
            layer as f32 + 1.0
        } else {
            layer as f32
        };

        let corners = [
            (u as f32, v as f32),
            (u as f32 + w as f32, v as f32),
            (u as f32 + w as f32, v as f32 + h as f32),
            (u as f32, v as f32 + h as f32),
        ];
        let uvs = [
            [0.0, 0.0],
            [w as f32, 0.0],
            [w as f32, h as f32],
            [0.0, h as f32],
        ];

        let base = self.vertices.len() as u32;
        for (i, &(cu, cv)) in corners.iter().enumerate() {
            let mut pos = [0.0_f32; 3];
            pos[layer_axis] = layer_pos;
            pos[u_axis] = cu;
            pos[v_axis] = cv;
            self.vertices.push(SurfaceVertex {
                position: (Vec3::from(pos) + origin).to_array(),
                normal,
                uv: uvs[i],
                uv_rect: uv_rect.to_array(),
            });
        }

        // Counter-clockwise seen from outside; flips when the (u, v) basis is
        // left-handed around the normal.
        if winds_forward(direction) {
            self.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        } else {
            self.indices
                .extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
        }

        self.quads.push(QuadInfo {
            direction,
            area: w * h,
        });
    }

    pub fn count_quads_for_direction(&self, direction: FaceDirection) -> usize {
        self.quads
            .iter()
            .filter(|q| q.direction == direction)
            .count()
    }

    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

fn winds_forward(direction: FaceDirection) -> bool {
    let (_, u, v) = direction.sweep_axes();
    let mut eu = Vec3::ZERO;
    let mut ev = Vec3::ZERO;
    eu[u] = 1.0;
    ev[v] = 1.0;
    eu.cross(ev).dot(Vec3::from(direction.normal())) > 0.0
}

/// Merged geometry for one block type in a greedy chunk mesh.
#[derive(Clone, Debug)]
pub struct Surface {
    pub block_type: BlockTypeId,
    pub material: std::sync::Arc<crate::cache::Material>,
    pub buffers: SurfaceBuffers,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: UvRect = UvRect {
        min: [0.0, 0.0],
        max: [1.0, 1.0],
    };

    #[test]
    fn test_empty_buffers() {
        let buffers = SurfaceBuffers::new();
        assert!(buffers.is_empty());
        assert_eq!(buffers.quad_count(), 0);
        assert_eq!(buffers.triangle_count(), 0);
    }

    #[test]
    fn test_push_single_quad() {
        let mut buffers = SurfaceBuffers::new();
        buffers.push_quad(FaceDirection::PosY, 0, 0, 0, 1, 1, Vec3::ZERO, FULL);
        assert_eq!(buffers.vertices.len(), 4);
        assert_eq!(buffers.indices.len(), 6);
        assert_eq!(buffers.quad_count(), 1);
        assert!(buffers.vertices.iter().all(|v| v.position[1] == 1.0));
    }

    #[test]
    fn test_origin_offsets_vertices() {
        let mut buffers = SurfaceBuffers::new();
        buffers.push_quad(FaceDirection::NegX, 0, 0, 0, 1, 1, Vec3::new(16.0, 0.0, -16.0), FULL);
        assert!(buffers.vertices.iter().all(|v| v.position[0] == 16.0));
        assert!(buffers.vertices.iter().all(|v| v.position[2] <= -15.0));
    }

    #[test]
    fn test_winding_faces_outward() {
        for dir in FaceDirection::ALL {
            let mut buffers = SurfaceBuffers::new();
            buffers.push_quad(dir, 0, 0, 0, 1, 1, Vec3::ZERO, FULL);
            let p = |i: usize| Vec3::from(buffers.vertices[buffers.indices[i] as usize].position);
            let n = (p(1) - p(0)).cross(p(2) - p(0));
            assert!(
                n.dot(Vec3::from(dir.normal())) > 0.0,
                "triangle for {dir:?} faces inward"
            );
        }
    }

    #[test]
    fn test_uv_tiles_across_merged_quad() {
        let mut buffers = SurfaceBuffers::new();
        buffers.push_quad(FaceDirection::PosZ, 3, 0, 0, 4, 2, Vec3::ZERO, FULL);
        assert_eq!(buffers.vertices[2].uv, [4.0, 2.0]);
        assert_eq!(buffers.quads[0].area, 8);
    }
}
