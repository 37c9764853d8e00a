//! # World Module
//!
//! This module provides the `World` struct: the chunk store and the only writer of
//! chunk state. It owns the loaded chunks, the streaming center, the task manager
//! and the stream of render commands handed to the host.
//!
//! ## Architecture
//!
//! Chunks are kept in a hash map keyed by [`ChunkCoord`]. Each entry tracks its
//! lifecycle state, its block data (shared with jobs through `Arc`), a data
//! version bumped on every change, and the jobs currently outstanding for it.
//!
//! Workers never touch this map. Terrain and mesh jobs return plain data, and
//! [`World::update`] applies it on the calling thread after checking that the
//! job is still the current one for its chunk.
//!
//! ## Data Flow
//!
//! 1. [`World::request_stream`] tracks new coordinates and submits terrain jobs
//! 2. Generated terrain is stored and marks the chunk `Generated`
//! 3. Any chunk whose lateral neighbours are ready gets a mesh job
//! 4. Mesh results become [`RenderCommand::Upload`]s; eviction emits `Dispose`
//!
//! ## Block Access
//!
//! World coordinates are split with floored division, so negative coordinates
//! resolve to the chunk below zero. Edits bump the version of the owning chunk
//! and of any lateral neighbour that shares the edited edge.

use std::collections::HashMap;
use std::sync::Arc;

use cgmath::Point3;
use log::{debug, info};
use thiserror::Error;

use crate::{
    config::WorldConfig,
    engine_state::{
        rendering::RenderCommand,
        task_management::{SchedulerStats, TaskHandle, TaskKind, TaskManager},
    },
};

use super::{
    block::{BlockId, BlockRegistry},
    chunk::{ChunkCoord, ChunkError, ChunkState, VoxelChunk},
    terrain::{TerrainGenerator, TerrainSource},
};

mod lifecycle;
pub mod overflow;
mod streaming;

use overflow::OverflowLedger;
pub use streaming::chunks_in_radius;

/// Errors raised by world block access.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// The height is outside the world.
    #[error("block ({x}, {y}, {z}) is outside the world's vertical range")]
    OutOfBounds {
        /// World X
        x: i32,
        /// World Y
        y: i32,
        /// World Z
        z: i32,
    },

    /// The owning chunk is not tracked.
    #[error("chunk {0} is not loaded")]
    ChunkNotLoaded(ChunkCoord),

    /// The owning chunk has no block data yet.
    #[error("chunk {0} has not been generated")]
    ChunkNotGenerated(ChunkCoord),

    /// The block id is not in the registry.
    #[error("unknown block id {0}")]
    UnknownBlock(BlockId),

    /// Local chunk access failed.
    #[error(transparent)]
    Chunk(#[from] ChunkError),
}

/// Everything the world tracks about one chunk.
#[derive(Debug)]
struct ChunkEntry {
    state: ChunkState,
    data: Option<Arc<VoxelChunk>>,
    /// Bumped whenever the chunk's blocks, or a neighbour it was meshed against, change.
    version: u64,
    meshed_version: Option<u64>,
    uploaded: bool,
    generation_job: Option<TaskHandle>,
    mesh_job: Option<TaskHandle>,
    generation_attempts: u32,
}

impl ChunkEntry {
    fn new() -> Self {
        ChunkEntry {
            state: ChunkState::Generating,
            data: None,
            version: 0,
            meshed_version: None,
            uploaded: false,
            generation_job: None,
            mesh_job: None,
            generation_attempts: 0,
        }
    }

    fn has_data(&self) -> bool {
        self.state >= ChunkState::Generated
    }
}

/// The chunk store.
pub struct World {
    config: WorldConfig,
    registry: Arc<BlockRegistry>,
    terrain: Arc<dyn TerrainSource>,
    chunks: HashMap<ChunkCoord, ChunkEntry>,
    center: Option<ChunkCoord>,
    radius: u32,
    task_manager: TaskManager,
    overflow: OverflowLedger,
    render_commands: Vec<RenderCommand>,
}

impl World {
    /// Creates an empty world.
    ///
    /// # Arguments
    /// * `config` - Chunk size, streaming radius and pool sizes
    /// * `registry` - Block table shared with mesh jobs
    /// * `terrain` - Source of generated chunks
    pub fn new(
        config: WorldConfig,
        registry: Arc<BlockRegistry>,
        terrain: Arc<dyn TerrainSource>,
    ) -> Self {
        info!(
            "Creating world: seed {}, chunks {}x{}x{}, radius {}",
            config.seed,
            config.chunk.size_x,
            config.chunk.size_z,
            config.chunk.height,
            config.stream_radius
        );
        World {
            radius: config.stream_radius,
            task_manager: TaskManager::new(config.terrain_workers, config.mesh_workers),
            config,
            registry,
            terrain,
            chunks: HashMap::new(),
            center: None,
            overflow: OverflowLedger::new(),
            render_commands: Vec::new(),
        }
    }

    /// Creates a world using the noise generator seeded from `config.seed`.
    pub fn with_generator(config: WorldConfig, registry: Arc<BlockRegistry>) -> Self {
        let terrain = Arc::new(TerrainGenerator::new(config.seed));
        World::new(config, registry, terrain)
    }

    /// Runs one tick: applies finished jobs, follows the viewer, and starts queued jobs.
    pub fn update(&mut self, viewer: Point3<f32>) {
        self.process_completed_tasks();

        let dims = self.config.chunk;
        let (viewer_chunk, _, _) =
            ChunkCoord::from_world(viewer.x.floor() as i32, viewer.z.floor() as i32, &dims);
        if self.center != Some(viewer_chunk) {
            self.request_stream(viewer_chunk.x, viewer_chunk.z, self.radius);
        }

        self.task_manager.process_queued_tasks();
    }

    /// Runs one tick without moving the streaming center.
    pub fn pump(&mut self) {
        self.process_completed_tasks();
        self.task_manager.process_queued_tasks();
    }

    /// Looks up a block by world coordinate.
    ///
    /// # Returns
    /// `None` when the height is outside the world or the owning chunk has no data.
    /// Air in a loaded chunk is `Some(AIR)`.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<BlockId> {
        if y < 0 || y as usize >= self.config.chunk.height {
            return None;
        }
        let (coord, local_x, local_z) = ChunkCoord::from_world(x, z, &self.config.chunk);
        let data = self.chunks.get(&coord)?.data.as_ref()?;
        data.get(local_x, y as usize, local_z).ok()
    }

    /// Replaces a block by world coordinate and schedules the affected re-meshes.
    ///
    /// # Returns
    /// The block that was there before.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) -> Result<BlockId, WorldError> {
        if !self.registry.is_known(block) {
            return Err(WorldError::UnknownBlock(block));
        }
        if y < 0 || y as usize >= self.config.chunk.height {
            return Err(WorldError::OutOfBounds { x, y, z });
        }

        let (coord, local_x, local_z) = ChunkCoord::from_world(x, z, &self.config.chunk);
        let entry = self
            .chunks
            .get_mut(&coord)
            .ok_or(WorldError::ChunkNotLoaded(coord))?;
        let data = entry
            .data
            .as_mut()
            .ok_or(WorldError::ChunkNotGenerated(coord))?;

        let previous = Arc::make_mut(data).set(local_x, y as usize, local_z, block)?;
        if previous != block {
            debug!("Set block ({x}, {y}, {z}) to {block} in chunk {coord}");
            for dirty in self.mark_columns_dirty(coord, &[(local_x, local_z)]) {
                self.maybe_mesh(dirty);
            }
        }
        Ok(previous)
    }

    /// Takes every render command emitted since the last call.
    pub fn drain_render_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.render_commands)
    }

    /// Lifecycle state of a tracked chunk.
    pub fn chunk_state(&self, coord: ChunkCoord) -> Option<ChunkState> {
        self.chunks.get(&coord).map(|entry| entry.state)
    }

    /// Block data of a generated chunk.
    pub fn chunk_data(&self, coord: ChunkCoord) -> Option<Arc<VoxelChunk>> {
        self.chunks.get(&coord).and_then(|entry| entry.data.clone())
    }

    /// Current data version of a tracked chunk.
    pub fn chunk_version(&self, coord: ChunkCoord) -> Option<u64> {
        self.chunks.get(&coord).map(|entry| entry.version)
    }

    /// Data version the chunk's current geometry was built from.
    pub fn meshed_version(&self, coord: ChunkCoord) -> Option<u64> {
        self.chunks.get(&coord).and_then(|entry| entry.meshed_version)
    }

    /// Outstanding job of `kind` for a chunk.
    pub fn pending_job(&self, coord: ChunkCoord, kind: TaskKind) -> Option<&TaskHandle> {
        let entry = self.chunks.get(&coord)?;
        match kind {
            TaskKind::Terrain => entry.generation_job.as_ref(),
            TaskKind::Mesh => entry.mesh_job.as_ref(),
        }
    }

    /// Tracked chunk coordinates, sorted.
    pub fn loaded_chunks(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        coords.sort();
        coords
    }

    /// Number of tracked chunks.
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of tracked chunks in `state`.
    pub fn count_in_state(&self, state: ChunkState) -> usize {
        self.chunks.values().filter(|entry| entry.state == state).count()
    }

    /// The last streaming center.
    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    /// The streaming radius in chunks.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Changes the streaming radius. Takes effect on the next stream request.
    pub fn set_radius(&mut self, radius: u32) {
        self.radius = radius;
    }

    /// The block table.
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// The configuration the world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Scheduler counters.
    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.task_manager.stats()
    }

    /// Whether no job is outstanding.
    pub fn is_idle(&self) -> bool {
        self.task_manager.is_idle()
    }

    /// Whether no job is outstanding and every tracked chunk is meshed at its
    /// current version.
    ///
    /// A chunk whose generation gave up keeps this false.
    pub fn is_settled(&self) -> bool {
        self.is_idle()
            && self
                .chunks
                .values()
                .all(|entry| entry.meshed_version == Some(entry.version))
    }

    /// Pending cross-chunk writes.
    pub fn overflow(&self) -> &OverflowLedger {
        &self.overflow
    }
}

#[cfg(test)]
mod tests;
