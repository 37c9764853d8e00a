//! # Engine State Module
//!
//! The core engine module that owns the voxel world and the meshes handed to a renderer.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container, ticked once per frame
//! * `rendering` - Greedy meshing and the render command hand-off
//! * `task_management` - Worker pools for terrain and mesh jobs
//! * `voxels` - Blocks, chunks, terrain generation and the world store
//!
//! ## Architecture
//!
//! `EngineState` drives the [`World`] with the viewer position each frame and
//! forwards the world's render commands into a [`MeshStore`]. Everything
//! expensive runs on the task manager's workers; the frame thread only applies
//! finished results.

use std::sync::Arc;

use cgmath::Point3;
use log::info;
use rendering::{MeshPass, MeshStore};
use voxels::{block::BlockRegistry, chunk::ChunkState, world::World};

use crate::config::WorldConfig;

pub mod rendering;
pub mod task_management;
pub mod voxels;

/// The main state container for the voxel engine
///
/// # Examples
///
/// ```no_run
/// use cgmath::Point3;
/// use voxel_world::{config::WorldConfig, engine_state::EngineState};
///
/// let mut engine_state = EngineState::new(WorldConfig::default());
///
/// // Main loop
/// loop {
///     engine_state.update(Point3::new(0.0, 80.0, 0.0));
/// }
/// ```
pub struct EngineState {
    /// The voxel world containing all chunk data
    pub world: World,
    /// Meshes the renderer should currently draw
    pub mesh_store: MeshStore,
    /// Number of frames run
    frames: u64,
}

impl EngineState {
    /// Creates a new engine state with a noise-generated world.
    ///
    /// # Arguments
    ///
    /// * `config` - World settings, usually loaded with [`WorldConfig::load`]
    ///
    /// # Returns
    ///
    /// A fully initialized `EngineState` instance
    pub fn new(config: WorldConfig) -> Self {
        let registry = Arc::new(BlockRegistry::standard());
        EngineState::with_world(World::with_generator(config, registry))
    }

    /// Wraps an existing world.
    pub fn with_world(world: World) -> Self {
        EngineState {
            world,
            mesh_store: MeshStore::new(),
            frames: 0,
        }
    }

    /// Runs one frame.
    ///
    /// Applies finished jobs, follows the viewer and forwards render commands
    /// to the mesh store.
    ///
    /// # Arguments
    ///
    /// * `viewer` - Position of the camera in world space
    pub fn update(&mut self, viewer: Point3<f32>) {
        self.world.update(viewer);
        self.mesh_store.apply_all(self.world.drain_render_commands());
        self.frames += 1;
    }

    /// Whether every streamed chunk is generated, meshed and handed to the mesh store.
    pub fn is_settled(&self) -> bool {
        self.world.is_settled()
    }

    /// Number of frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Logs a one-line summary of the world and the mesh store.
    pub fn log_stats(&self) {
        let stats = self.world.scheduler_stats();
        let (uploads, disposals) = self.mesh_store.counters();
        info!(
            "Frame {}: {} chunks ({} generating, {} meshed), {} meshes / {} quads / {} KiB opaque, {} terrain + {} mesh jobs, {} cancelled, {} failed, {} uploads, {} disposals",
            self.frames,
            self.world.loaded_count(),
            self.world.count_in_state(ChunkState::Generating),
            self.world.count_in_state(ChunkState::Meshed),
            self.mesh_store.len(),
            self.mesh_store.total_quads(),
            self.mesh_store.total_vertex_bytes(MeshPass::Opaque) / 1024,
            stats.submitted_terrain,
            stats.submitted_mesh,
            stats.cancelled,
            stats.failed,
            uploads,
            disposals,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::engine_state::voxels::{
        block::block_type::BlockType,
        chunk::{ChunkCoord, ChunkDimensions},
        terrain::{GeneratedTerrain, GenerationError, TerrainSource},
    };

    fn threaded_config(seed: u32) -> WorldConfig {
        WorldConfig {
            seed,
            chunk: ChunkDimensions {
                size_x: 16,
                size_z: 16,
                height: 128,
            },
            stream_radius: 2,
            terrain_workers: 2,
            mesh_workers: 2,
            max_generation_attempts: 3,
        }
    }

    fn run_until_settled(engine_state: &mut EngineState, viewer: Point3<f32>) {
        let start = web_time::Instant::now();
        loop {
            engine_state.update(viewer);
            if engine_state.is_settled() {
                return;
            }
            assert!(start.elapsed() < Duration::from_secs(120), "world did not settle");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn threaded_world_streams_and_meshes() {
        let viewer = Point3::new(8.0, 90.0, 8.0);
        let mut engine_state = EngineState::new(threaded_config(42));
        run_until_settled(&mut engine_state, viewer);

        assert_eq!(engine_state.world.loaded_count(), 13);
        assert_eq!(engine_state.world.count_in_state(ChunkState::Meshed), 13);
        assert_eq!(engine_state.mesh_store.len(), 13);
        assert!(engine_state.mesh_store.total_quads() > 0);
        assert!(engine_state.mesh_store.total_vertex_bytes(MeshPass::Opaque) > 0);

        // Edits are picked up by the workers and re-meshed.
        engine_state
            .world
            .set_block(3, 120, 3, BlockType::LOG.id())
            .unwrap();
        let (uploads_before, _) = engine_state.mesh_store.counters();
        run_until_settled(&mut engine_state, viewer);
        assert_eq!(engine_state.world.get_block(3, 120, 3), Some(BlockType::LOG.id()));
        assert!(engine_state.mesh_store.counters().0 > uploads_before);
        let origin = ChunkCoord::new(0, 0);
        assert_eq!(
            engine_state.world.meshed_version(origin),
            engine_state.world.chunk_version(origin)
        );
    }

    /// Terrain that never succeeds.
    struct BrokenTerrain;

    impl TerrainSource for BrokenTerrain {
        fn generate(
            &self,
            _coord: ChunkCoord,
            dims: ChunkDimensions,
        ) -> Result<GeneratedTerrain, GenerationError> {
            Err(GenerationError::InvalidDimensions(dims))
        }
    }

    #[test]
    fn abandoned_chunks_keep_the_engine_unsettled() {
        let config = WorldConfig {
            stream_radius: 0,
            terrain_workers: 0,
            mesh_workers: 0,
            ..threaded_config(1)
        };
        let world = World::new(config, Arc::new(BlockRegistry::standard()), Arc::new(BrokenTerrain));
        let mut engine_state = EngineState::with_world(world);

        for _ in 0..8 {
            engine_state.update(Point3::new(8.0, 90.0, 8.0));
        }
        assert!(engine_state.world.is_idle());
        assert_eq!(engine_state.world.count_in_state(ChunkState::Generating), 1);
        assert_eq!(engine_state.world.scheduler_stats().failed, 3);
        assert!(!engine_state.is_settled());
    }

    #[test]
    fn same_seed_gives_the_same_world() {
        let viewer = Point3::new(-20.0, 90.0, 5.0);
        let mut first = EngineState::new(threaded_config(7));
        let mut second = EngineState::new(threaded_config(7));
        run_until_settled(&mut first, viewer);
        run_until_settled(&mut second, viewer);

        assert_eq!(first.world.loaded_chunks(), second.world.loaded_chunks());
        for coord in first.world.loaded_chunks() {
            assert_eq!(first.world.chunk_data(coord), second.world.chunk_data(coord));
        }
    }
}
