//! Procedural test maps: a simplex fBm heightfield filled with layered
//! columns.

use noise::{NoiseFn, Simplex};
use voxmap_core::BlockPos;
use voxmap_voxel::BlockTypeId;

pub const STONE: BlockTypeId = BlockTypeId(1);
pub const DIRT: BlockTypeId = BlockTypeId(2);
pub const GRASS: BlockTypeId = BlockTypeId(3);

/// Dirt layers between the grass and the stone.
const DIRT_DEPTH: i32 = 3;

#[derive(Clone, Debug)]
pub struct HeightfieldParams {
    pub seed: u32,
    pub octaves: u32,
    pub base_frequency: f64,
    pub lacunarity: f64,
    pub persistence: f64,
    /// Mean column height in blocks.
    pub base_height: i32,
    /// Height swing of the first octave.
    pub amplitude: f64,
}

impl Default for HeightfieldParams {
    fn default() -> Self {
        Self {
            seed: 7,
            octaves: 4,
            base_frequency: 0.02,
            lacunarity: 2.0,
            persistence: 0.5,
            base_height: 12,
            amplitude: 6.0,
        }
    }
}

pub struct Heightfield {
    noise: Simplex,
    params: HeightfieldParams,
}

impl Heightfield {
    pub fn new(params: HeightfieldParams) -> Self {
        Self {
            noise: Simplex::new(params.seed),
            params,
        }
    }

    /// Column height at `(x, z)`, at least one block.
    pub fn height(&self, x: i32, z: i32) -> i32 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;
        for _ in 0..self.params.octaves {
            total += self.noise.get([f64::from(x) * frequency, f64::from(z) * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }
        (self.params.base_height + total.round() as i32).max(1)
    }

    /// Fills columns row by row over a square centred on the origin until
    /// exactly `target` blocks have been produced.
    pub fn blocks(&self, target: usize) -> Vec<(BlockPos, BlockTypeId)> {
        let mean = self.params.base_height.max(1) as usize;
        let side = ((target / mean) as f64).sqrt().ceil() as i32 + 2;
        let half = side / 2;

        let mut blocks = Vec::with_capacity(target);
        'columns: for x in -half..side - half {
            for z in -half..side - half {
                let top = self.height(x, z) - 1;
                for y in 0..=top {
                    if blocks.len() == target {
                        break 'columns;
                    }
                    let id = match top - y {
                        0 => GRASS,
                        d if d <= DIRT_DEPTH => DIRT,
                        _ => STONE,
                    };
                    blocks.push((BlockPos::new(x, y, z), id));
                }
            }
        }
        blocks
    }
}
