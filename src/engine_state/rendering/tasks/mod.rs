//! Rendering-related background tasks.

pub mod chunk_mesh_generation_task;
