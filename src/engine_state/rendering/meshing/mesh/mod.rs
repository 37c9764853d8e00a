//! Mesh generation for voxel rendering.
//!
//! This module converts chunk data into quads, vertices and indices. It implements
//! greedy meshing to reduce the number of faces by combining coplanar faces of the
//! same block and shading.
//!
//! # Architecture
//! - [`GreedyMesher`]: Sweeps a chunk neighbourhood and emits merged quads
//! - [`Quad`]: One merged rectangle with its corners, texture and corner shading
//! - [`ChunkMesh`] / [`MeshBuffers`]: Per-pass vertex and index data
//! - `ambient_occlusion`: Per-corner occlusion levels
//!
//! # Usage
//! ```no_run
//! use std::sync::Arc;
//! use voxel_world::engine_state::{
//!     rendering::meshing::{ChunkNeighborhood, GreedyMesher},
//!     voxels::{block::BlockRegistry, chunk::{ChunkCoord, ChunkDimensions, VoxelChunk}},
//! };
//!
//! let chunk = VoxelChunk::empty(ChunkCoord::new(0, 0), ChunkDimensions::default());
//! let mut mesher = GreedyMesher::new(Arc::new(BlockRegistry::standard()));
//! let mesh = mesher.mesh_chunk(&ChunkNeighborhood::isolated(Arc::new(chunk)));
//! assert!(mesh.is_empty());
//! ```

pub mod ambient_occlusion;
mod greedy;
mod mesh;
mod quad;

pub use greedy::GreedyMesher;
pub use mesh::{ChunkMesh, MeshBuffers};
pub use quad::Quad;
