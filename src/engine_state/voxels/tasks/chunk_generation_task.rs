//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask` which fills one chunk on a
//! terrain worker. The task is scheduled by the world when a coordinate enters
//! the streaming radius.

use std::sync::Arc;

use log::debug;
use web_time::Instant;

use crate::engine_state::{
    task_management::task::{Task, TaskError, TaskResult},
    voxels::{
        chunk::{ChunkCoord, ChunkDimensions},
        terrain::{GeneratedTerrain, TerrainSource},
        world::World,
    },
};

/// A task that generates the blocks of one chunk.
pub struct ChunkGenerationTask {
    /// The generator, shared between all terrain tasks
    source: Arc<dyn TerrainSource>,
    /// The chunk to generate
    coord: ChunkCoord,
    /// Extents of the chunk
    dims: ChunkDimensions,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `source` - The terrain generator
    /// * `coord` - The chunk to generate
    /// * `dims` - Extents of the chunk
    pub fn new(source: Arc<dyn TerrainSource>, coord: ChunkCoord, dims: ChunkDimensions) -> Self {
        ChunkGenerationTask {
            source,
            coord,
            dims,
        }
    }
}

impl Task for ChunkGenerationTask {
    fn process(&self) -> Result<Box<dyn TaskResult + Send>, TaskError> {
        let start = Instant::now();
        let terrain = self.source.generate(self.coord, self.dims)?;
        debug!(
            "Generated chunk {} in {:?} ({} overflow targets)",
            self.coord,
            start.elapsed(),
            terrain.overflow.len()
        );
        Ok(Box::new(ChunkGenerationTaskResult { terrain }))
    }
}

/// The result of a chunk generation task.
pub struct ChunkGenerationTaskResult {
    /// The generated chunk and its overflow
    terrain: GeneratedTerrain,
}

impl TaskResult for ChunkGenerationTaskResult {
    /// Stores the chunk. The world schedules any meshing that becomes possible.
    fn handle_result(self: Box<Self>, world: &mut World) {
        world.apply_generated(self.terrain);
    }
}
