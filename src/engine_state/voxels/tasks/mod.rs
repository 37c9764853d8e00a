//! # Voxel Task System
//!
//! Tasks that produce voxel data off the main thread.

pub mod chunk_generation_task;
