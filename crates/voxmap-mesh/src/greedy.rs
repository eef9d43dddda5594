//! Greedy meshing: merges coplanar, same-type exposed faces into larger
//! rectangular quads to reduce triangle count.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use voxmap_core::{BlockPos, FaceDirection};
use voxmap_voxel::{BlockTypeCatalog, BlockTypeId, ChunkSnapshot, GeometryHint};

use crate::atlas::{TextureAtlas, UvRect};
use crate::builder::MeshBuildError;
use crate::cache::MaterialCache;
use crate::surface::{Surface, SurfaceBuffers};

/// Dense copy of a chunk's interior, `0` meaning air.
struct DenseChunk<'a> {
    size: usize,
    cells: Vec<u16>,
    snapshot: &'a ChunkSnapshot,
    origin: BlockPos,
}

impl<'a> DenseChunk<'a> {
    fn new(snapshot: &'a ChunkSnapshot) -> Self {
        let size = snapshot.chunk_size() as usize;
        let mut cells = vec![0u16; size * size * size];
        for &(pos, id) in snapshot.blocks() {
            let (x, y, z) = pos.local(snapshot.chunk_size());
            cells[x + y * size + z * size * size] = id.0;
        }
        Self {
            size,
            cells,
            snapshot,
            origin: snapshot.key().min_block(snapshot.chunk_size()),
        }
    }

    fn get(&self, x: usize, y: usize, z: usize) -> u16 {
        self.cells[x + y * self.size + z * self.size * self.size]
    }

    /// Block at a local offset that may fall one step outside the chunk.
    fn get_signed(&self, x: i32, y: i32, z: i32) -> u16 {
        let s = self.size as i32;
        if (0..s).contains(&x) && (0..s).contains(&y) && (0..s).contains(&z) {
            self.get(x as usize, y as usize, z as usize)
        } else {
            self.snapshot
                .get(self.origin.offset(x, y, z))
                .map_or(0, |id| id.0)
        }
    }

    /// Whether the face of the block at `(x, y, z)` pointing along
    /// `direction` is visible. Opaque neighbours hide it; so does a
    /// see-through neighbour of the same type.
    fn is_exposed(
        &self,
        catalog: &BlockTypeCatalog,
        (x, y, z): (usize, usize, usize),
        direction: FaceDirection,
    ) -> bool {
        let own = self.get(x, y, z);
        let d = direction.ivec();
        let neighbor = self.get_signed(x as i32 + d.x, y as i32 + d.y, z as i32 + d.z);
        if neighbor == 0 {
            return true;
        }
        neighbor != own && !catalog.is_opaque(BlockTypeId(neighbor))
    }
}

/// Converts abstract axis coordinates back to concrete `(x, y, z)`.
fn axes_to_xyz(
    layer_axis: usize,
    u_axis: usize,
    v_axis: usize,
    layer: usize,
    u: usize,
    v: usize,
) -> (usize, usize, usize) {
    let mut coords = [0usize; 3];
    coords[layer_axis] = layer;
    coords[u_axis] = u;
    coords[v_axis] = v;
    (coords[0], coords[1], coords[2])
}

/// Resolves the atlas tile of every face of every block type in the chunk.
///
/// Fails on the first type that is unknown, is not a cube, or lacks a tile
/// for some face.
fn resolve_tiles(
    snapshot: &ChunkSnapshot,
    catalog: &BlockTypeCatalog,
    atlas: &dyn TextureAtlas,
) -> Result<FxHashMap<u16, [UvRect; 6]>, MeshBuildError> {
    let mut tiles = FxHashMap::default();
    for id in snapshot.block_types() {
        let def = catalog
            .get(id)
            .ok_or(MeshBuildError::UnknownBlockType(id))?;
        if def.geometry != GeometryHint::Cube {
            return Err(MeshBuildError::UnsupportedGeometry(id));
        }
        let mut rects = [UvRect::FULL; 6];
        for face in FaceDirection::ALL {
            rects[face.index()] = atlas
                .uv_rect(id, face)
                .ok_or(MeshBuildError::MissingUv { id, face })?;
        }
        tiles.insert(id.0, rects);
    }
    Ok(tiles)
}

/// Builds one merged surface per block type, ordered by type id.
///
/// Output positions are in world space. A chunk whose blocks are all
/// hidden produces an empty surface list.
pub fn greedy_mesh(
    snapshot: &ChunkSnapshot,
    catalog: &BlockTypeCatalog,
    atlas: &dyn TextureAtlas,
    materials: &mut MaterialCache,
) -> Result<Vec<Surface>, MeshBuildError> {
    let tiles = resolve_tiles(snapshot, catalog, atlas)?;
    let chunk = DenseChunk::new(snapshot);
    let size = chunk.size;
    let origin = chunk.origin.min_corner();

    let mut buffers: BTreeMap<u16, SurfaceBuffers> = BTreeMap::new();
    let mut visited = vec![false; size * size];
    // Exposed block type per (u, v) cell of the current layer, 0 if none.
    let mut mask = vec![0u16; size * size];

    for direction in FaceDirection::ALL {
        let (layer_axis, u_axis, v_axis) = direction.sweep_axes();

        for layer in 0..size {
            visited.fill(false);

            let mut any = false;
            for v in 0..size {
                for u in 0..size {
                    let xyz = axes_to_xyz(layer_axis, u_axis, v_axis, layer, u, v);
                    let id = chunk.get(xyz.0, xyz.1, xyz.2);
                    mask[v * size + u] = if id != 0 && chunk.is_exposed(catalog, xyz, direction) {
                        any = true;
                        id
                    } else {
                        0
                    };
                }
            }
            if !any {
                continue;
            }

            for v in 0..size {
                for u in 0..size {
                    let idx = v * size + u;
                    let block_type = mask[idx];
                    if visited[idx] || block_type == 0 {
                        continue;
                    }

                    // Extend width along u-axis.
                    let mut w = 1;
                    while u + w < size {
                        let ni = v * size + u + w;
                        if visited[ni] || mask[ni] != block_type {
                            break;
                        }
                        w += 1;
                    }

                    // Extend height along v-axis.
                    let mut h = 1;
                    'outer: while v + h < size {
                        for du in 0..w {
                            let ni = (v + h) * size + u + du;
                            if visited[ni] || mask[ni] != block_type {
                                break 'outer;
                            }
                        }
                        h += 1;
                    }

                    for dv in 0..h {
                        for du in 0..w {
                            visited[(v + dv) * size + u + du] = true;
                        }
                    }

                    let rect = tiles
                        .get(&block_type)
                        .map_or(UvRect::FULL, |r| r[direction.index()]);
                    buffers.entry(block_type).or_default().push_quad(
                        direction, layer, u, v, w, h, origin, rect,
                    );
                }
            }
        }
    }

    let mut surfaces = Vec::with_capacity(buffers.len());
    for (id, buffers) in buffers {
        let id = BlockTypeId(id);
        let def = catalog.get(id).ok_or(MeshBuildError::UnknownBlockType(id))?;
        surfaces.push(Surface {
            block_type: id,
            material: materials.get_or_create(def, atlas),
            buffers,
        });
    }
    Ok(surfaces)
}
