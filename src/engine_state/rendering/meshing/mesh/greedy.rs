//! Greedy meshing implementation for voxel rendering.
//!
//! This module implements the greedy meshing algorithm which combines adjacent coplanar
//! faces with the same block and the same corner shading into larger quads, significantly
//! reducing the number of vertices needed to render a chunk.
//!
//! For each of the three axes the mesher walks every plane between two block layers,
//! fills a 2D mask with the faces that are visible on that plane, then grows rectangles
//! over the mask. Mask values are signed: a positive id is a face of the block behind the
//! plane pointing along the axis, a negative id a face of the block in front of it
//! pointing back.

use std::sync::Arc;

use bitvec::vec::BitVec;
use cgmath::Point3;
use log::trace;
use web_time::Instant;

use crate::engine_state::{
    rendering::meshing::{neighborhood::PaddedVolume, ChunkNeighborhood, MeshPass},
    voxels::block::{block_side::BlockSide, BlockId, BlockRegistry, AIR},
};

use super::{
    ambient_occlusion::{self, corner_slot},
    mesh::{ChunkMesh, MeshBuffers},
    quad::Quad,
};

/// Corner slots of a positive face's corners, in winding order.
const POSITIVE_CORNER_SLOTS: [(bool, bool); 4] = [(false, false), (true, false), (true, true), (false, true)];
/// Corner slots of a negative face's corners, in winding order.
const NEGATIVE_CORNER_SLOTS: [(bool, bool); 4] = [(false, false), (false, true), (true, true), (true, false)];

/// One cell of the per-plane mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MaskCell {
    /// Signed block id, 0 when no face is visible
    face: i32,
    /// Packed corner occlusion of the face
    ao: u8,
}

impl MaskCell {
    const EMPTY: MaskCell = MaskCell { face: 0, ao: 0 };

    fn is_empty(&self) -> bool {
        self.face == 0
    }
}

/// Builds chunk meshes with greedy quad merging and per-corner ambient occlusion.
///
/// A mesher keeps its scratch mask between calls, so reusing one for several
/// chunks avoids reallocating it.
pub struct GreedyMesher {
    /// Block table used for textures
    registry: Arc<BlockRegistry>,
    /// Transparency of every possible block id
    transparent: BitVec,
    /// Scratch mask for one plane
    mask: Vec<MaskCell>,
}

impl GreedyMesher {
    /// Creates a mesher for the blocks of a registry.
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        let mut transparent = BitVec::repeat(false, BlockId::MAX as usize + 1);
        for id in 0..=BlockId::MAX {
            transparent.set(id as usize, registry.is_transparent(id));
        }

        GreedyMesher {
            registry,
            transparent,
            mask: Vec::new(),
        }
    }

    /// Whether this mesher was built for `registry`.
    pub fn serves(&self, registry: &Arc<BlockRegistry>) -> bool {
        Arc::ptr_eq(&self.registry, registry)
    }

    /// Cells the scratch mask can hold without reallocating.
    pub fn scratch_capacity(&self) -> usize {
        self.mask.capacity()
    }

    /// Meshes both render passes of a chunk.
    ///
    /// # Arguments
    /// * `neighborhood` - The chunk and its lateral neighbours
    ///
    /// # Returns
    /// The opaque and transparent geometry in chunk-local coordinates.
    pub fn mesh_chunk(&mut self, neighborhood: &ChunkNeighborhood) -> ChunkMesh {
        let start = Instant::now();
        let volume = neighborhood.pad(&self.registry);
        let opaque = self.sweep(&volume, MeshPass::Opaque);
        let transparent = self.sweep(&volume, MeshPass::Transparent);
        trace!(
            "Greedy meshed chunk {} in {:?}",
            neighborhood.coord(),
            start.elapsed()
        );

        ChunkMesh {
            coord: neighborhood.coord(),
            opaque,
            transparent,
        }
    }

    /// Meshes a single render pass of a chunk.
    pub fn mesh_pass(&mut self, neighborhood: &ChunkNeighborhood, pass: MeshPass) -> MeshBuffers {
        let volume = neighborhood.pad(&self.registry);
        self.sweep(&volume, pass)
    }

    fn is_transparent(&self, block: BlockId) -> bool {
        self.transparent[block as usize]
    }

    /// Whether `owner` shows a face towards `other` in this pass.
    ///
    /// Air never hides a face. Opaque blocks hide everything; transparent
    /// blocks hide faces of other transparent blocks but not of opaque ones, so
    /// the ground stays visible under water.
    fn shows_face(&self, owner: BlockId, other: BlockId, pass: MeshPass) -> bool {
        if owner == AIR || self.is_transparent(owner) != (pass == MeshPass::Transparent) {
            return false;
        }
        other == AIR || (!self.is_transparent(owner) && self.is_transparent(other))
    }

    fn sweep(&mut self, volume: &PaddedVolume, pass: MeshPass) -> MeshBuffers {
        let size = volume.size();
        let largest_plane = (size[0] * size[1]).max(size[1] * size[2]).max(size[0] * size[2]);
        if self.mask.len() < largest_plane as usize {
            self.mask.resize(largest_plane as usize, MaskCell::EMPTY);
        }

        let mut quads = Vec::new();
        for axis in 0..3 {
            let u = (axis + 1) % 3;
            let v = (axis + 2) % 3;
            // X and Z planes include both chunk borders; the world has no faces
            // below its floor or above its ceiling.
            let planes = if axis == 1 {
                0..size[axis] - 1
            } else {
                -1..size[axis]
            };

            for plane in planes {
                self.fill_mask(volume, pass, axis, plane);
                self.merge_mask(axis, plane + 1, size[u], size[v], &mut quads);
            }
        }

        MeshBuffers::from_quads(quads)
    }

    /// Records the faces visible between layer `plane` and layer `plane + 1`.
    fn fill_mask(&mut self, volume: &PaddedVolume, pass: MeshPass, axis: usize, plane: i32) {
        let size = volume.size();
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;

        for j in 0..size[v] {
            for i in 0..size[u] {
                let mut behind = [0; 3];
                behind[axis] = plane;
                behind[u] = i;
                behind[v] = j;
                let mut ahead = behind;
                ahead[axis] += 1;

                let block_behind = volume.block(behind);
                let block_ahead = volume.block(ahead);

                // Only faces of blocks inside the chunk are emitted.
                let cell = if plane >= 0 && self.shows_face(block_behind, block_ahead, pass) {
                    MaskCell {
                        face: block_behind as i32,
                        ao: ambient_occlusion::face_ao(volume, ahead, u, v),
                    }
                } else if plane + 1 < size[axis] && self.shows_face(block_ahead, block_behind, pass) {
                    MaskCell {
                        face: -(block_ahead as i32),
                        ao: ambient_occlusion::face_ao(volume, behind, u, v),
                    }
                } else {
                    MaskCell::EMPTY
                };
                self.mask[(i + j * size[u]) as usize] = cell;
            }
        }
    }

    /// Grows rectangles of identical cells over the mask and emits them as quads.
    ///
    /// Each rectangle is first extended along `u` while cells match, then along
    /// `v` while the whole run matches. Consumed cells are cleared.
    fn merge_mask(&mut self, axis: usize, layer: i32, size_u: i32, size_v: i32, quads: &mut Vec<Quad>) {
        let at = |i: i32, j: i32| (i + j * size_u) as usize;

        for j in 0..size_v {
            let mut i = 0;
            while i < size_u {
                let cell = self.mask[at(i, j)];
                if cell.is_empty() {
                    i += 1;
                    continue;
                }

                let mut width = 1;
                while i + width < size_u && self.mask[at(i + width, j)] == cell {
                    width += 1;
                }

                let mut height = 1;
                'rows: while j + height < size_v {
                    for k in 0..width {
                        if self.mask[at(i + k, j + height)] != cell {
                            break 'rows;
                        }
                    }
                    height += 1;
                }

                quads.push(self.build_quad(cell, axis, layer, [i, j], [width, height]));

                for row in j..j + height {
                    for column in i..i + width {
                        self.mask[at(column, row)] = MaskCell::EMPTY;
                    }
                }
                i += width;
            }
        }
    }

    fn build_quad(
        &self,
        cell: MaskCell,
        axis: usize,
        layer: i32,
        [i, j]: [i32; 2],
        [width, height]: [i32; 2],
    ) -> Quad {
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;
        let positive = cell.face > 0;
        let block = cell.face.unsigned_abs() as BlockId;
        let side = BlockSide::from_axis(axis, positive);

        let mut base = [0; 3];
        base[axis] = layer;
        base[u] = i;
        base[v] = j;
        let mut du = [0; 3];
        du[u] = width;
        let mut dv = [0; 3];
        dv[v] = height;

        let offset = |a: [i32; 3], b: [i32; 3]| [a[0] + b[0], a[1] + b[1], a[2] + b[2]];
        let far = offset(offset(base, du), dv);
        let (corners, slots) = if positive {
            ([base, offset(base, du), far, offset(base, dv)], POSITIVE_CORNER_SLOTS)
        } else {
            ([base, offset(base, dv), far, offset(base, du)], NEGATIVE_CORNER_SLOTS)
        };

        Quad {
            corners: corners.map(Point3::from),
            side,
            block,
            texture: self.registry.face_texture(block, side),
            ao: slots.map(|(high_u, high_v)| {
                ambient_occlusion::unpack(cell.ao, corner_slot(high_u, high_v))
            }),
            width: width as u32,
            height: height as u32,
        }
    }
}
