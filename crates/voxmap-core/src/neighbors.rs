//! Face directions and the static 26-neighbourhood offsets shared by meshing,
//! invalidation, and visibility adjacency.

use glam::IVec3;

/// One of the six axis-aligned directions a block face can point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FaceDirection {
    /// +X direction.
    PosX = 0,
    /// −X direction.
    NegX = 1,
    /// +Y direction.
    PosY = 2,
    /// −Y direction.
    NegY = 3,
    /// +Z direction.
    PosZ = 4,
    /// −Z direction.
    NegZ = 5,
}

impl FaceDirection {
    /// All six directions in order.
    pub const ALL: [FaceDirection; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    /// Returns the sweep axes for greedy meshing: `(layer_axis, u_axis, v_axis)`.
    ///
    /// `layer_axis` is perpendicular to the face; `u_axis` and `v_axis` span
    /// the face plane. Each value is 0=X, 1=Y, 2=Z.
    pub fn sweep_axes(self) -> (usize, usize, usize) {
        match self {
            Self::PosX | Self::NegX => (0, 2, 1),
            Self::PosY | Self::NegY => (1, 0, 2),
            Self::PosZ | Self::NegZ => (2, 0, 1),
        }
    }

    pub fn normal(self) -> [f32; 3] {
        let v = self.ivec();
        [v.x as f32, v.y as f32, v.z as f32]
    }

    /// Unit offset toward the neighbour across this face.
    pub fn ivec(self) -> IVec3 {
        match self {
            Self::PosX => IVec3::X,
            Self::NegX => IVec3::NEG_X,
            Self::PosY => IVec3::Y,
            Self::NegY => IVec3::NEG_Y,
            Self::PosZ => IVec3::Z,
            Self::NegZ => IVec3::NEG_Z,
        }
    }

    /// Returns the face direction matching an axis-aligned unit normal.
    pub fn from_normal(normal: IVec3) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.ivec() == normal)
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Self::PosX | Self::PosY | Self::PosZ)
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::PosX => Self::NegX,
            Self::NegX => Self::PosX,
            Self::PosY => Self::NegY,
            Self::NegY => Self::PosY,
            Self::PosZ => Self::NegZ,
            Self::NegZ => Self::PosZ,
        }
    }

    /// Returns the direction index (0–5).
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The 6 face-adjacent offsets.
pub const FACE_OFFSETS: [IVec3; 6] = [
    IVec3::new(1, 0, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 0, -1),
];

/// The 8 corner-adjacent offsets (all three axes displaced).
pub const CORNER_OFFSETS: [IVec3; 8] = [
    IVec3::new(-1, -1, -1),
    IVec3::new(1, -1, -1),
    IVec3::new(-1, 1, -1),
    IVec3::new(1, 1, -1),
    IVec3::new(-1, -1, 1),
    IVec3::new(1, -1, 1),
    IVec3::new(-1, 1, 1),
    IVec3::new(1, 1, 1),
];

/// The 12 edge-adjacent offsets (exactly two axes displaced).
pub const EDGE_OFFSETS: [IVec3; 12] = [
    IVec3::new(1, 1, 0),
    IVec3::new(1, -1, 0),
    IVec3::new(1, 0, 1),
    IVec3::new(1, 0, -1),
    IVec3::new(-1, 1, 0),
    IVec3::new(-1, -1, 0),
    IVec3::new(-1, 0, 1),
    IVec3::new(-1, 0, -1),
    IVec3::new(0, 1, 1),
    IVec3::new(0, 1, -1),
    IVec3::new(0, -1, 1),
    IVec3::new(0, -1, -1),
];

/// Full 26-neighbourhood: faces first, then corners, then edges.
pub const NEIGHBOR_OFFSETS: [IVec3; 26] = {
    let mut out = [IVec3::ZERO; 26];
    let mut i = 0;
    while i < 6 {
        out[i] = FACE_OFFSETS[i];
        i += 1;
    }
    let mut j = 0;
    while j < 8 {
        out[6 + j] = CORNER_OFFSETS[j];
        j += 1;
    }
    let mut k = 0;
    while k < 12 {
        out[14 + k] = EDGE_OFFSETS[k];
        k += 1;
    }
    out
};
