//! Integer block coordinates and the chunk keys they partition into.

use std::fmt;

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BlockPos
// ---------------------------------------------------------------------------

/// Integer coordinate of a unit-cube block. The block occupies
/// `[x, x+1) × [y, y+1) × [z, z+1)` in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The block containing a world-space point.
    pub fn containing(point: Vec3) -> Self {
        Self::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        )
    }

    /// Returns the chunk this block belongs to for chunk edge length `chunk_size`.
    #[must_use]
    pub fn chunk(self, chunk_size: i32) -> ChunkKey {
        ChunkKey::new(
            self.x.div_euclid(chunk_size),
            self.y.div_euclid(chunk_size),
            self.z.div_euclid(chunk_size),
        )
    }

    /// Position relative to the owning chunk's minimum corner, each axis in `0..chunk_size`.
    #[must_use]
    pub fn local(self, chunk_size: i32) -> (usize, usize, usize) {
        (
            self.x.rem_euclid(chunk_size) as usize,
            self.y.rem_euclid(chunk_size) as usize,
            self.z.rem_euclid(chunk_size) as usize,
        )
    }

    #[must_use]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// World-space centre of the block.
    #[must_use]
    pub fn center(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32) + Vec3::splat(0.5)
    }

    /// World-space minimum corner of the block.
    #[must_use]
    pub fn min_corner(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl From<IVec3> for BlockPos {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// ChunkKey
// ---------------------------------------------------------------------------

/// Identifies a cubic chunk: `floor(coord / S)` on each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// First block (minimum corner) inside this chunk.
    #[must_use]
    pub fn min_block(self, chunk_size: i32) -> BlockPos {
        BlockPos::new(
            self.x * chunk_size,
            self.y * chunk_size,
            self.z * chunk_size,
        )
    }

    /// World-space centre of the chunk volume.
    #[must_use]
    pub fn center(self, chunk_size: i32) -> Vec3 {
        let s = chunk_size as f32;
        Vec3::new(self.x as f32, self.y as f32, self.z as f32) * s + Vec3::splat(s * 0.5)
    }

    /// Returns true if `pos` lies inside this chunk.
    pub fn contains(self, pos: BlockPos, chunk_size: i32) -> bool {
        pos.chunk(chunk_size) == self
    }

    /// Chebyshev distance in chunk units.
    pub fn chebyshev(self, other: ChunkKey) -> i32 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}
