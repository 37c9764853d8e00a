//! # Voxel World Core
//!
//! This module contains the voxel data model and the store that streams it around
//! the viewer.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: Block ids, the registry of block properties and face textures
//! * **Chunk**: Fixed-size column of blocks addressed by a 2D chunk coordinate
//! * **Terrain**: Deterministic noise-driven generation, including trees
//! * **World**: Tracks loaded chunks, their lifecycle and edits
//! * **Tasks**: Terrain jobs that run on worker threads
//!
//! ## Data Flow
//!
//! 1. The world tracks the chunks inside the streaming radius
//! 2. Terrain jobs fill them on workers
//! 3. Generated chunks with ready neighbours get mesh jobs
//! 4. Finished meshes become render commands for the host
//!
//! ## Thread Safety
//!
//! Workers only ever see immutable `Arc` snapshots of chunk data. All state
//! transitions happen on the thread that owns the world.

pub mod block;
pub mod chunk;
pub mod tasks;
pub mod terrain;
pub mod world;
