//! Mesh generation for voxel rendering.
//!
//! This module handles the conversion of voxel data into GPU-friendly meshes.
//! Meshing runs on worker threads against an immutable [`ChunkNeighborhood`],
//! and the results flow back to the world as [`ChunkMesh`] values.
//!
//! # Architecture
//! - `neighborhood`: The chunk plus its four lateral neighbours
//! - `mesh/`: Greedy meshing, ambient occlusion and the output buffers
//!
//! # Render Passes
//! Every chunk is meshed twice, once for opaque blocks and once for
//! transparent ones. The transparent pass is drawn last with blending enabled.

mod mesh;
mod neighborhood;

pub use mesh::*;
pub use neighborhood::{ChunkNeighborhood, NEG_X, NEG_Z, POS_X, POS_Z};

/// The two geometry passes of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshPass {
    /// Blocks that fully hide what is behind them
    Opaque,
    /// Water, leaves and other see-through blocks
    Transparent,
}

impl MeshPass {
    /// Both passes in draw order.
    pub fn all() -> [MeshPass; 2] {
        [MeshPass::Opaque, MeshPass::Transparent]
    }
}
