use cgmath::Point3;

use crate::engine_state::{
    rendering::Vertex,
    voxels::block::{block_side::BlockSide, BlockId, TextureOffset},
};

/// Index pattern using the 0-2 diagonal.
const INDICES_MAIN_DIAGONAL: [u32; 6] = [0, 1, 2, 0, 2, 3];
/// Index pattern using the 1-3 diagonal.
const INDICES_FLIPPED_DIAGONAL: [u32; 6] = [1, 2, 3, 1, 3, 0];

/// A merged, axis-aligned rectangle of block faces.
///
/// Corners are in chunk space and wind counter-clockwise when viewed from the
/// side the face points to. `width` runs from corner 0 towards corner 1 on
/// positive faces and towards corner 3 on negative faces; `height` covers the
/// other edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    /// The four corners in winding order
    pub corners: [Point3<i32>; 4],
    /// Direction the face points to
    pub side: BlockSide,
    /// The block the face belongs to
    pub block: BlockId,
    /// Atlas tile of this face
    pub texture: TextureOffset,
    /// Ambient occlusion level of each corner, 0 (darkest) to 3
    pub ao: [u8; 4],
    /// Extent along the first in-plane axis
    pub width: u32,
    /// Extent along the second in-plane axis
    pub height: u32,
}

impl Quad {
    /// Whether the quad is split along the 1-3 diagonal.
    ///
    /// The diagonal joining the brighter pair of corners is kept, which stops
    /// occlusion gradients from being interpolated across the wrong triangle.
    pub fn is_flipped(&self) -> bool {
        let [a0, a1, a2, a3] = self.ao.map(u16::from);
        a0 + a2 < a1 + a3
    }

    /// Triangle indices for this quad, offset by the first vertex it occupies.
    pub fn indices(&self, first_vertex: u32) -> [u32; 6] {
        let pattern = if self.is_flipped() {
            INDICES_FLIPPED_DIAGONAL
        } else {
            INDICES_MAIN_DIAGONAL
        };
        pattern.map(|index| index + first_vertex)
    }

    /// Builds the four vertices of this quad.
    ///
    /// Tiling coordinates follow the quad's extents so the atlas tile repeats
    /// once per block.
    pub fn vertices(&self) -> [Vertex; 4] {
        let (w, h) = (self.width, self.height);
        let tiling = if self.side.is_positive() {
            [(0, 0), (w, 0), (w, h), (0, h)]
        } else {
            [(0, 0), (0, h), (w, h), (w, 0)]
        };
        std::array::from_fn(|i| {
            let (u, v) = tiling[i];
            Vertex::new(self.corners[i], self.texture, u, v, self.ao[i])
        })
    }

    /// Number of block faces this quad covers.
    pub fn area(&self) -> u32 {
        self.width * self.height
    }
}
