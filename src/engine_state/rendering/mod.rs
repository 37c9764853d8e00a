//! Rendering side of the voxel engine.
//!
//! This module contains mesh generation and the hand-off of finished meshes to
//! a renderer. The world never talks to a graphics API directly; it emits
//! [`RenderCommand`]s, and [`MeshStore`] keeps the set of meshes a renderer
//! should currently draw.

use std::collections::HashMap;

use log::{debug, trace};

use crate::engine_state::voxels::chunk::ChunkCoord;

pub mod meshing;
pub mod tasks;
mod vertex;

// Re-export commonly used types
pub use meshing::{ChunkMesh, MeshPass};
pub use vertex::Vertex;

/// Instruction for the renderer produced by the world.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Replace the geometry of a chunk
    Upload {
        /// The chunk the mesh belongs to
        coord: ChunkCoord,
        /// The new geometry
        mesh: ChunkMesh,
    },
    /// Release the geometry of a chunk that left the streaming radius
    Dispose {
        /// The chunk to release
        coord: ChunkCoord,
    },
}

impl RenderCommand {
    /// The chunk this command refers to.
    pub fn coord(&self) -> ChunkCoord {
        match self {
            RenderCommand::Upload { coord, .. } | RenderCommand::Dispose { coord } => *coord,
        }
    }
}

/// CPU-side mirror of what a renderer holds on the GPU.
///
/// Applying every command the world emits keeps exactly one mesh per meshed,
/// loaded chunk.
#[derive(Debug, Default)]
pub struct MeshStore {
    /// Current mesh of each uploaded chunk
    meshes: HashMap<ChunkCoord, ChunkMesh>,
    /// Number of uploads applied so far
    uploads: u64,
    /// Number of disposals applied so far
    disposals: u64,
}

impl MeshStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one command.
    pub fn apply(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::Upload { coord, mesh } => {
                trace!(
                    "Uploading chunk {coord}: {} quads, {} bytes",
                    mesh.quad_count(),
                    mesh.byte_size()
                );
                self.uploads += 1;
                self.meshes.insert(coord, mesh);
            }
            RenderCommand::Dispose { coord } => {
                if self.meshes.remove(&coord).is_some() {
                    self.disposals += 1;
                } else {
                    debug!("Dispose for chunk {coord} without an uploaded mesh");
                }
            }
        }
    }

    /// Applies a batch of commands in order.
    pub fn apply_all(&mut self, commands: impl IntoIterator<Item = RenderCommand>) {
        for command in commands {
            self.apply(command);
        }
    }

    /// The mesh currently held for a chunk.
    pub fn get(&self, coord: ChunkCoord) -> Option<&ChunkMesh> {
        self.meshes.get(&coord)
    }

    /// Whether a chunk currently has a mesh.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.meshes.contains_key(&coord)
    }

    /// Number of chunks with a mesh.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether no chunk has a mesh.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Quads over all held meshes.
    pub fn total_quads(&self) -> usize {
        self.meshes.values().map(ChunkMesh::quad_count).sum()
    }

    /// Vertex bytes over all held meshes for one pass.
    pub fn total_vertex_bytes(&self, pass: MeshPass) -> usize {
        self.meshes
            .values()
            .map(|mesh| bytemuck::cast_slice::<Vertex, u8>(&mesh.pass(pass).vertices).len())
            .sum()
    }

    /// Uploads and disposals applied so far.
    pub fn counters(&self) -> (u64, u64) {
        (self.uploads, self.disposals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::meshing::MeshBuffers;

    fn mesh(coord: ChunkCoord) -> ChunkMesh {
        ChunkMesh {
            coord,
            opaque: MeshBuffers::default(),
            transparent: MeshBuffers::default(),
        }
    }

    #[test]
    fn upload_replaces_and_dispose_removes() {
        let coord = ChunkCoord::new(2, -1);
        let mut store = MeshStore::new();

        store.apply(RenderCommand::Upload { coord, mesh: mesh(coord) });
        store.apply(RenderCommand::Upload { coord, mesh: mesh(coord) });
        assert_eq!(store.len(), 1);

        store.apply(RenderCommand::Dispose { coord });
        store.apply(RenderCommand::Dispose { coord });
        assert!(store.is_empty());
        assert_eq!(store.counters(), (2, 1));
        assert_eq!(store.total_vertex_bytes(MeshPass::Opaque), 0);
    }
}
