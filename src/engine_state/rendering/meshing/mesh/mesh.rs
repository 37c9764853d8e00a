//! Mesh data structures for voxel rendering.
//!
//! A chunk produces two sets of buffers, one per render pass, so transparent
//! geometry can be drawn after everything opaque.

use crate::engine_state::{
    rendering::{meshing::MeshPass, Vertex},
    voxels::chunk::ChunkCoord,
};

use super::quad::Quad;

/// Geometry of one render pass of a chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    /// The merged quads, in emission order
    pub quads: Vec<Quad>,
    /// Four vertices per quad
    pub vertices: Vec<Vertex>,
    /// Six indices per quad
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    /// Expands quads into vertex and index buffers.
    ///
    /// # Arguments
    /// * `quads` - The quads of one pass
    ///
    /// # Returns
    /// Buffers where quad `i` owns vertices `4i..4i + 4` and indices `6i..6i + 6`.
    pub fn from_quads(quads: Vec<Quad>) -> Self {
        let mut vertices = Vec::with_capacity(quads.len() * 4);
        let mut indices = Vec::with_capacity(quads.len() * 6);
        for quad in &quads {
            let first_vertex = vertices.len() as u32;
            vertices.extend(quad.vertices());
            indices.extend(quad.indices(first_vertex));
        }

        MeshBuffers {
            quads,
            vertices,
            indices,
        }
    }

    /// Whether the pass has no geometry.
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Size of the vertex buffer in bytes.
    pub fn vertex_bytes(&self) -> usize {
        bytemuck::cast_slice::<Vertex, u8>(&self.vertices).len()
    }

    /// Size of the index buffer in bytes.
    pub fn index_bytes(&self) -> usize {
        bytemuck::cast_slice::<u32, u8>(&self.indices).len()
    }
}

/// Complete geometry of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMesh {
    /// The chunk this mesh belongs to
    pub coord: ChunkCoord,
    /// Geometry of fully opaque blocks
    pub opaque: MeshBuffers,
    /// Geometry of transparent blocks, drawn after the opaque pass
    pub transparent: MeshBuffers,
}

impl ChunkMesh {
    /// Buffers of one pass.
    pub fn pass(&self, pass: MeshPass) -> &MeshBuffers {
        match pass {
            MeshPass::Opaque => &self.opaque,
            MeshPass::Transparent => &self.transparent,
        }
    }

    /// Total quads over both passes.
    pub fn quad_count(&self) -> usize {
        self.opaque.quads.len() + self.transparent.quads.len()
    }

    /// Whether neither pass has geometry.
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }

    /// Bytes a renderer would upload for both passes.
    pub fn byte_size(&self) -> usize {
        [&self.opaque, &self.transparent]
            .iter()
            .map(|buffers| buffers.vertex_bytes() + buffers.index_bytes())
            .sum()
    }
}
