//! Brush footprints and the ground-placement heuristic used by edit gestures.

use serde::{Deserialize, Serialize};
use voxmap_core::BlockPos;

use crate::field::VoxelField;

/// Horizontal footprint stamped around the targeted block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementShape {
    #[default]
    Single,
    /// Centre plus the four horizontal face neighbours.
    Cross,
    /// Cross, the four diagonals, and a second ring along each axis (13 blocks).
    Diamond,
    /// 3×3 square.
    Square9,
    /// 4×4 square, offset so the centre is one of the four middle cells.
    Square16,
}

impl PlacementShape {
    /// `(dx, dz)` offsets relative to the centre block.
    pub fn offsets(self) -> Vec<(i32, i32)> {
        match self {
            PlacementShape::Single => vec![(0, 0)],
            PlacementShape::Cross => vec![(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)],
            PlacementShape::Diamond => vec![
                (0, 0),
                (1, 0),
                (-1, 0),
                (0, 1),
                (0, -1),
                (1, 1),
                (-1, -1),
                (1, -1),
                (-1, 1),
                (2, 0),
                (-2, 0),
                (0, 2),
                (0, -2),
            ],
            PlacementShape::Square9 => square(-1..=1),
            PlacementShape::Square16 => square(-2..=1),
        }
    }

    /// Parses a config name such as `"cross"` or `"square9"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "single" => Some(PlacementShape::Single),
            "cross" => Some(PlacementShape::Cross),
            "diamond" => Some(PlacementShape::Diamond),
            "square9" => Some(PlacementShape::Square9),
            "square16" => Some(PlacementShape::Square16),
            _ => None,
        }
    }

    /// Block positions covered when the shape is centred on `center`.
    pub fn positions(self, center: BlockPos) -> Vec<BlockPos> {
        self.offsets()
            .into_iter()
            .map(|(dx, dz)| center.offset(dx, 0, dz))
            .collect()
    }
}

fn square(range: std::ops::RangeInclusive<i32>) -> Vec<(i32, i32)> {
    range
        .clone()
        .flat_map(|dx| range.clone().map(move |dz| (dx, dz)))
        .collect()
}

/// Decides whether a ground-plane click may stamp blocks at `y = 0`
/// regardless of what is already there.
///
/// Ground hits near existing geometry are usually a ray slipping past a block
/// edge, so they are refused when any block lies closer than `min_clearance`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundPlacementPolicy {
    /// Radius searched for nearby blocks.
    pub check_radius: f32,
    /// Closest allowed distance between the target and an existing block.
    pub min_clearance: f32,
}

impl Default for GroundPlacementPolicy {
    fn default() -> Self {
        Self {
            check_radius: 3.0,
            min_clearance: 2.0,
        }
    }
}

impl GroundPlacementPolicy {
    /// Distance from `target` to the nearest block within `check_radius`.
    pub fn nearest_block(&self, field: &VoxelField, target: BlockPos) -> Option<f32> {
        let r = self.check_radius.ceil() as i32;
        let mut nearest: Option<f32> = None;
        for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    let d = ((dx * dx + dy * dy + dz * dz) as f32).sqrt();
                    if d > self.check_radius {
                        continue;
                    }
                    if field.contains(target.offset(dx, dy, dz))
                        && nearest.is_none_or(|n| d < n)
                    {
                        nearest = Some(d);
                    }
                }
            }
        }
        nearest
    }

    /// Whether a ground-plane placement at `target` is allowed.
    pub fn allows(&self, field: &VoxelField, target: BlockPos) -> bool {
        self.nearest_block(field, target)
            .is_none_or(|d| d >= self.min_clearance)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::catalog::BlockTypeId;

    #[test]
    fn test_shape_names() {
        assert_eq!(PlacementShape::from_name("Square9"), Some(PlacementShape::Square9));
        assert_eq!(PlacementShape::from_name("diamond"), Some(PlacementShape::Diamond));
        assert_eq!(PlacementShape::from_name("hexagon"), None);
    }

    #[test]
    fn test_shape_sizes() {
        assert_eq!(PlacementShape::Single.offsets().len(), 1);
        assert_eq!(PlacementShape::Cross.offsets().len(), 5);
        assert_eq!(PlacementShape::Diamond.offsets().len(), 13);
        assert_eq!(PlacementShape::Square9.offsets().len(), 9);
        assert_eq!(PlacementShape::Square16.offsets().len(), 16);
    }

    #[test]
    fn test_shapes_have_no_duplicates_and_include_center() {
        for shape in [
            PlacementShape::Single,
            PlacementShape::Cross,
            PlacementShape::Diamond,
            PlacementShape::Square9,
            PlacementShape::Square16,
        ] {
            let offsets = shape.offsets();
            let unique: HashSet<_> = offsets.iter().copied().collect();
            assert_eq!(unique.len(), offsets.len(), "{shape:?}");
            assert!(unique.contains(&(0, 0)), "{shape:?}");
        }
    }

    #[test]
    fn test_square16_extent() {
        let offsets = PlacementShape::Square16.offsets();
        assert!(offsets.iter().all(|&(x, z)| (-2..=1).contains(&x) && (-2..=1).contains(&z)));
    }

    #[test]
    fn test_positions_keep_height() {
        let center = BlockPos::new(10, 4, -3);
        for p in PlacementShape::Diamond.positions(center) {
            assert_eq!(p.y, 4);
        }
    }

    #[test]
    fn test_ground_placement_allowed_on_empty_field() {
        let field = VoxelField::new(16);
        let policy = GroundPlacementPolicy::default();
        assert!(policy.allows(&field, BlockPos::new(0, 0, 0)));
        assert_eq!(policy.nearest_block(&field, BlockPos::new(0, 0, 0)), None);
    }

    #[test]
    fn test_ground_placement_blocked_near_block() {
        let mut field = VoxelField::new(16);
        field.set_block(BlockPos::new(1, 0, 1), BlockTypeId(1));
        let policy = GroundPlacementPolicy::default();
        let d = policy.nearest_block(&field, BlockPos::new(0, 0, 0)).unwrap();
        assert!((d - 2f32.sqrt()).abs() < 1e-6);
        assert!(!policy.allows(&field, BlockPos::new(0, 0, 0)));
    }

    #[test]
    fn test_ground_placement_allowed_beyond_clearance() {
        let mut field = VoxelField::new(16);
        field.set_block(BlockPos::new(2, 0, 1), BlockTypeId(1));
        let policy = GroundPlacementPolicy::default();
        assert!(policy.allows(&field, BlockPos::new(0, 0, 0)));

        let strict = GroundPlacementPolicy {
            check_radius: 3.0,
            min_clearance: 2.5,
        };
        assert!(!strict.allows(&field, BlockPos::new(0, 0, 0)));
    }
}
