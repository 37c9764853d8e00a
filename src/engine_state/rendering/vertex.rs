//! Vertex data structures and layouts for voxel rendering.
//!
//! This module defines the vertex format produced by the mesher. The layout is
//! `repr(C)` and `Pod` so a renderer can upload vertex slices without copying.

use cgmath::Point3;

use crate::engine_state::voxels::block::TextureOffset;

/// A vertex of a chunk mesh.
///
/// Positions are local to the chunk; the renderer adds the chunk origin.
///
/// # Memory Layout
/// - Position: 3x i32 (12 bytes)
/// - Texture Offset: [f32; 2] (8 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Ambient Occlusion: u32 (4 bytes)
///
/// Total size: 32 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
    /// Z coordinate in chunk space
    pub z: i32,
    /// Corner of the block's atlas tile
    pub texture_offset: [f32; 2],
    /// Tiling coordinates in block units, so a merged quad repeats its tile
    pub tex_coords: [f32; 2],
    /// Ambient occlusion level, 0 (darkest) to 3 (unoccluded)
    pub ao: u32,
}

impl Vertex {
    /// Size of one vertex in bytes.
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();

    /// Creates a new vertex with the given parameters.
    ///
    /// # Arguments
    /// * `pos` - The position of the vertex in chunk space
    /// * `texture` - Atlas offset of the block face
    /// * `u` - U tiling coordinate in blocks
    /// * `v` - V tiling coordinate in blocks
    /// * `ao` - Ambient occlusion level of this corner
    ///
    /// # Returns
    /// A new `Vertex` instance
    pub fn new(pos: Point3<i32>, texture: TextureOffset, u: u32, v: u32, ao: u8) -> Self {
        Vertex {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            texture_offset: [texture.u, texture.v],
            tex_coords: [u as f32, v as f32],
            ao: ao as u32,
        }
    }

    /// Position of the vertex as a point.
    pub fn position(&self) -> Point3<i32> {
        Point3::new(self.x, self.y, self.z)
    }
}
