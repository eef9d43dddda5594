//! Sample-ray occlusion heuristic for whole chunks.
//!
//! A chunk is sampled at its centre and at five points (centre plus four
//! inset corners) on each face that looks toward the viewer. Each sample is
//! reached by a grid walk from the viewer; the walk is blocked by an opaque
//! block that lies outside the target chunk. Blocks inside the target never
//! count, so a chunk cannot hide itself.

use glam::Vec3;
use voxmap_core::{BlockPos, ChunkKey, FaceDirection};
use voxmap_voxel::BlockTypeCatalog;

use crate::index::ChunkIndex;
use crate::walk::GridWalk;

/// Fraction of a face's half-extent used to inset the corner samples.
const CORNER_INSET: f32 = 0.8;

impl ChunkIndex {
    /// Whether more than `threshold` of the sample rays toward `chunk` are
    /// blocked by opaque geometry between it and `viewer`.
    pub fn is_chunk_occluded(
        &self,
        chunk: ChunkKey,
        viewer: Vec3,
        threshold: f32,
        catalog: &BlockTypeCatalog,
    ) -> bool {
        let size = self.chunk_size();
        let viewer_chunk = BlockPos::containing(viewer).chunk(size);
        if viewer_chunk.chebyshev(chunk) <= 1 {
            return false;
        }

        let samples = sample_points(chunk, size, viewer);
        let blocked = samples
            .iter()
            .filter(|&&p| self.is_sample_blocked(chunk, viewer, p, catalog))
            .count();

        blocked as f32 / samples.len() as f32 > threshold
    }

    fn is_sample_blocked(
        &self,
        target: ChunkKey,
        viewer: Vec3,
        point: Vec3,
        catalog: &BlockTypeCatalog,
    ) -> bool {
        let to_point = point - viewer;
        let distance = to_point.length();
        if distance <= f32::EPSILON {
            return false;
        }
        let size = self.chunk_size();
        for step in GridWalk::new(viewer, to_point / distance, distance) {
            if target.contains(step.cell, size) {
                return false;
            }
            if let Some(id) = self.get_block(step.cell)
                && catalog.is_opaque(id)
            {
                return true;
            }
        }
        false
    }
}

/// Chunk centre plus centre and inset corners of every face whose outward
/// normal points toward `viewer`.
fn sample_points(chunk: ChunkKey, chunk_size: i32, viewer: Vec3) -> Vec<Vec3> {
    let center = chunk.center(chunk_size);
    let half = chunk_size as f32 * 0.5;
    let mut samples = vec![center];

    for face in FaceDirection::ALL {
        let normal = Vec3::from(face.normal());
        let face_center = center + normal * half;
        if (viewer - face_center).dot(normal) <= 0.0 {
            continue;
        }
        // Nudge samples just inside the chunk so the walk terminates in it.
        let inner = face_center - normal * 0.01;
        samples.push(inner);

        let (_, u, v) = face.sweep_axes();
        let mut du = Vec3::ZERO;
        let mut dv = Vec3::ZERO;
        du[u] = half * CORNER_INSET;
        dv[v] = half * CORNER_INSET;
        for (su, sv) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
            samples.push(inner + du * su + dv * sv);
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use voxmap_voxel::{BlockTypeDef, BlockTypeId};

    use super::*;

    const STONE: BlockTypeId = BlockTypeId(1);
    const GLASS: BlockTypeId = BlockTypeId(2);

    fn catalog() -> BlockTypeCatalog {
        let mut glass = BlockTypeDef::cube(2, "glass", "glass.png");
        glass.transparent = true;
        BlockTypeCatalog::from_defs([BlockTypeDef::cube(1, "stone", "stone.png"), glass])
            .unwrap()
    }

    /// Fills a 64×64 slab of blocks in the plane `x`.
    fn wall(index: &mut ChunkIndex, x: i32, id: BlockTypeId) {
        for y in -16..48 {
            for z in -16..48 {
                index.set_block(BlockPos::new(x, y, z), id);
            }
        }
    }

    #[test]
    fn test_open_space_is_not_occluded() {
        let index = ChunkIndex::new(16);
        let viewer = Vec3::new(8.0, 8.0, 8.0);
        assert!(!index.is_chunk_occluded(ChunkKey::new(4, 0, 0), viewer, 0.7, &catalog()));
    }

    #[test]
    fn test_wall_occludes_chunk_behind_it() {
        let mut index = ChunkIndex::new(16);
        wall(&mut index, 40, STONE);
        let viewer = Vec3::new(8.0, 8.0, 8.0);
        assert!(index.is_chunk_occluded(ChunkKey::new(4, 0, 0), viewer, 0.7, &catalog()));
    }

    #[test]
    fn test_transparent_wall_does_not_occlude() {
        let mut index = ChunkIndex::new(16);
        wall(&mut index, 40, GLASS);
        let viewer = Vec3::new(8.0, 8.0, 8.0);
        assert!(!index.is_chunk_occluded(ChunkKey::new(4, 0, 0), viewer, 0.7, &catalog()));
    }

    #[test]
    fn test_blocks_inside_target_do_not_self_occlude() {
        let mut index = ChunkIndex::new(16);
        // Solid outer face of the target chunk itself.
        wall(&mut index, 64, STONE);
        let viewer = Vec3::new(8.0, 8.0, 8.0);
        assert!(!index.is_chunk_occluded(ChunkKey::new(4, 0, 0), viewer, 0.7, &catalog()));
    }

    #[test]
    fn test_nearby_viewer_is_never_occluded() {
        let mut index = ChunkIndex::new(16);
        wall(&mut index, 20, STONE);
        let viewer = Vec3::new(8.0, 8.0, 8.0);
        assert!(!index.is_chunk_occluded(ChunkKey::new(1, 0, 0), viewer, 0.0, &catalog()));
    }

    #[test]
    fn test_near_face_selection() {
        // Viewer diagonally off one corner sees three faces.
        let samples = sample_points(ChunkKey::new(0, 0, 0), 16, Vec3::new(-50.0, -50.0, -50.0));
        assert_eq!(samples.len(), 1 + 3 * 5);
        // Viewer straight ahead sees one face.
        let samples = sample_points(ChunkKey::new(0, 0, 0), 16, Vec3::new(8.0, 8.0, -50.0));
        assert_eq!(samples.len(), 1 + 5);
    }
}
