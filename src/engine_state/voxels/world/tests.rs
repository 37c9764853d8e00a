use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::engine_state::{
    rendering::{MeshStore, RenderCommand},
    task_management::TaskKind,
    voxels::{
        block::{block_type::BlockType, AIR},
        chunk::{ChunkDimensions, ChunkState},
        terrain::{GeneratedTerrain, GenerationError, OverflowWrite},
    },
};

const DIMS: ChunkDimensions = ChunkDimensions {
    size_x: 16,
    size_z: 16,
    height: 8,
};

/// Stone up to y = 2 and grass at y = 3, with scripted failures and overflow.
#[derive(Default)]
struct FlatTerrain {
    /// Failures left per chunk before generation succeeds
    failures: Mutex<HashMap<ChunkCoord, u32>>,
    /// Overflow each source chunk emits
    overflow: HashMap<ChunkCoord, HashMap<ChunkCoord, Vec<OverflowWrite>>>,
    /// Successful generations per chunk
    generated: Mutex<HashMap<ChunkCoord, usize>>,
    /// Calls including failures
    calls: AtomicUsize,
}

impl FlatTerrain {
    fn failing(coord: ChunkCoord, times: u32) -> Self {
        let terrain = FlatTerrain::default();
        terrain.failures.lock().unwrap().insert(coord, times);
        terrain
    }

    fn generated(&self, coord: ChunkCoord) -> usize {
        self.generated.lock().unwrap().get(&coord).copied().unwrap_or(0)
    }
}

impl TerrainSource for FlatTerrain {
    fn generate(
        &self,
        coord: ChunkCoord,
        dims: ChunkDimensions,
    ) -> Result<GeneratedTerrain, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(remaining) = self.failures.lock().unwrap().get_mut(&coord) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(GenerationError::InvalidDimensions(dims));
            }
        }

        let mut chunk = VoxelChunk::empty(coord, dims);
        for x in 0..dims.size_x {
            for z in 0..dims.size_z {
                for y in 0..3 {
                    chunk.set(x, y, z, BlockType::STONE.id())?;
                }
                chunk.set(x, 3, z, BlockType::GRASS.id())?;
            }
        }
        *self.generated.lock().unwrap().entry(coord).or_default() += 1;

        Ok(GeneratedTerrain {
            chunk,
            overflow: self.overflow.get(&coord).cloned().unwrap_or_default(),
        })
    }
}

fn config(radius: u32) -> WorldConfig {
    WorldConfig {
        seed: 0,
        chunk: DIMS,
        stream_radius: radius,
        terrain_workers: 0,
        mesh_workers: 0,
        max_generation_attempts: 3,
    }
}

fn world_with(terrain: Arc<FlatTerrain>, radius: u32) -> World {
    World::new(config(radius), Arc::new(BlockRegistry::standard()), terrain)
}

/// Pumps until no job is outstanding.
fn settle(world: &mut World) {
    for _ in 0..64 {
        world.pump();
        if world.is_idle() {
            return;
        }
    }
    panic!("world did not settle");
}

fn uploads(commands: &[RenderCommand]) -> Vec<ChunkCoord> {
    let mut coords: Vec<ChunkCoord> = commands
        .iter()
        .filter(|command| matches!(command, RenderCommand::Upload { .. }))
        .map(RenderCommand::coord)
        .collect();
    coords.sort();
    coords
}

fn disposals(commands: &[RenderCommand]) -> Vec<ChunkCoord> {
    let mut coords: Vec<ChunkCoord> = commands
        .iter()
        .filter(|command| matches!(command, RenderCommand::Dispose { .. }))
        .map(RenderCommand::coord)
        .collect();
    coords.sort();
    coords
}

#[test]
fn streaming_loads_generates_and_meshes_the_radius() {
    let terrain = Arc::new(FlatTerrain::default());
    let mut world = world_with(terrain.clone(), 1);

    world.update(Point3::new(8.0, 20.0, 8.0));
    assert_eq!(world.center(), Some(ChunkCoord::new(0, 0)));
    assert_eq!(world.loaded_count(), 5);
    assert_eq!(world.count_in_state(ChunkState::Generating), 5);

    settle(&mut world);
    assert_eq!(world.count_in_state(ChunkState::Meshed), 5);
    for coord in world.loaded_chunks() {
        assert_eq!(world.meshed_version(coord), world.chunk_version(coord));
        assert_eq!(terrain.generated(coord), 1);
    }

    let commands = world.drain_render_commands();
    assert_eq!(uploads(&commands), world.loaded_chunks());
    assert!(world.drain_render_commands().is_empty());
}

#[test]
fn set_then_get_round_trips() {
    let mut world = world_with(Arc::new(FlatTerrain::default()), 1);
    world.request_stream(0, 0, 1);
    settle(&mut world);

    let blocks = [
        BlockType::STONE,
        BlockType::DIRT,
        BlockType::SAND,
        BlockType::LOG,
        BlockType::WATER,
        BlockType::AIR,
    ];
    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..200 {
        let (x, y, z) = (rng.i32(0..16), rng.i32(0..8), rng.i32(0..16));
        let block = blocks[rng.usize(..blocks.len())].id();
        world.set_block(x, y, z, block).unwrap();
        assert_eq!(world.get_block(x, y, z), Some(block));
    }
}

#[test]
fn world_coordinates_split_with_floored_division() {
    let mut world = world_with(Arc::new(FlatTerrain::default()), 2);
    world.request_stream(0, 0, 2);
    settle(&mut world);

    let before: HashMap<ChunkCoord, u64> = world
        .loaded_chunks()
        .into_iter()
        .map(|coord| (coord, world.chunk_version(coord).unwrap()))
        .collect();

    let previous = world.set_block(16, 5, 0, BlockType::LOG.id()).unwrap();
    assert_eq!(previous, AIR);
    let east = world.chunk_data(ChunkCoord::new(1, 0)).unwrap();
    assert_eq!(east.get(0, 5, 0).unwrap(), BlockType::LOG.id());

    // Column (0, 0) of chunk (1, 0) borders chunks (0, 0) and (1, -1).
    let bumped = |coord: ChunkCoord| world.chunk_version(coord).unwrap() > before[&coord];
    assert!(bumped(ChunkCoord::new(1, 0)));
    assert!(bumped(ChunkCoord::new(0, 0)));
    assert!(bumped(ChunkCoord::new(1, -1)));
    assert!(!bumped(ChunkCoord::new(2, 0)));
    assert!(!bumped(ChunkCoord::new(1, 1)));

    world.set_block(-1, 5, -1, BlockType::LOG.id()).unwrap();
    let south_west = world.chunk_data(ChunkCoord::new(-1, -1)).unwrap();
    assert_eq!(south_west.get(15, 5, 15).unwrap(), BlockType::LOG.id());
    assert_eq!(world.get_block(-1, 5, -1), Some(BlockType::LOG.id()));
}

#[test]
fn moving_the_center_evicts_and_cancels() {
    let terrain = Arc::new(FlatTerrain::default());
    let mut world = world_with(terrain.clone(), 2);

    world.request_stream(0, 0, 2);
    assert_eq!(world.loaded_count(), 13);
    world.request_stream(1, 0, 2);

    assert_eq!(world.loaded_chunks(), {
        let mut expected = chunks_in_radius(ChunkCoord::new(1, 0), 2);
        expected.sort();
        expected
    });
    for evicted in [(-2, 0), (-1, 1), (-1, -1), (0, 2), (0, -2)] {
        assert_eq!(world.chunk_state(ChunkCoord::new(evicted.0, evicted.1)), None);
    }
    let stats = world.scheduler_stats();
    assert_eq!(stats.submitted_terrain, 18);
    assert_eq!(stats.cancelled, 5);

    settle(&mut world);
    assert_eq!(terrain.calls.load(Ordering::SeqCst), 13);
    assert_eq!(terrain.generated(ChunkCoord::new(-2, 0)), 0);
    assert_eq!(world.count_in_state(ChunkState::Meshed), 13);
}

#[test]
fn missing_neighbour_blocks_meshing() {
    let terrain = Arc::new(FlatTerrain::failing(ChunkCoord::new(1, 0), u32::MAX));
    let mut world = world_with(terrain.clone(), 1);
    world.request_stream(0, 0, 1);
    settle(&mut world);

    let stuck = ChunkCoord::new(1, 0);
    assert_eq!(world.chunk_state(stuck), Some(ChunkState::Generating));
    assert_eq!(world.chunk_state(ChunkCoord::new(0, 0)), Some(ChunkState::Generated));
    assert!(!world.is_mesh_eligible(ChunkCoord::new(0, 0)));
    assert!(world.pending_job(ChunkCoord::new(0, 0), TaskKind::Mesh).is_none());
    for coord in [(-1, 0), (0, 1), (0, -1)] {
        assert_eq!(
            world.chunk_state(ChunkCoord::new(coord.0, coord.1)),
            Some(ChunkState::Meshed)
        );
    }

    let stats = world.scheduler_stats();
    assert_eq!(stats.failed, 3);
    assert_eq!(stats.submitted_terrain, 7);
    assert_eq!(terrain.calls.load(Ordering::SeqCst), 7);
}

#[test]
fn transient_generation_failures_are_retried() {
    let coord = ChunkCoord::new(0, 0);
    let terrain = Arc::new(FlatTerrain::failing(coord, 2));
    let mut world = world_with(terrain.clone(), 1);
    world.request_stream(0, 0, 1);
    settle(&mut world);

    assert_eq!(world.count_in_state(ChunkState::Meshed), 5);
    assert_eq!(terrain.generated(coord), 1);
    assert_eq!(world.scheduler_stats().failed, 2);
}

#[test]
fn edits_remesh_the_owner_and_bordering_neighbours() {
    let mut world = world_with(Arc::new(FlatTerrain::default()), 1);
    world.request_stream(0, 0, 1);
    settle(&mut world);
    world.drain_render_commands();

    world.set_block(5, 4, 5, BlockType::STONE.id()).unwrap();
    settle(&mut world);
    assert_eq!(uploads(&world.drain_render_commands()), vec![ChunkCoord::new(0, 0)]);

    world.set_block(15, 4, 5, BlockType::STONE.id()).unwrap();
    settle(&mut world);
    assert_eq!(
        uploads(&world.drain_render_commands()),
        vec![ChunkCoord::new(0, 0), ChunkCoord::new(1, 0)]
    );
    let origin = ChunkCoord::new(0, 0);
    assert_eq!(world.meshed_version(origin), world.chunk_version(origin));

    // Writing the same block again changes nothing.
    world.set_block(15, 4, 5, BlockType::STONE.id()).unwrap();
    settle(&mut world);
    assert!(world.drain_render_commands().is_empty());
}

#[test]
fn eviction_disposes_uploaded_meshes() {
    let mut world = world_with(Arc::new(FlatTerrain::default()), 1);
    let mut store = MeshStore::new();
    world.request_stream(0, 0, 1);
    settle(&mut world);
    let first_ring = world.loaded_chunks();
    store.apply_all(world.drain_render_commands());
    assert_eq!(store.len(), 5);

    world.request_stream(3, 0, 1);
    let commands = world.drain_render_commands();
    assert_eq!(disposals(&commands), first_ring);
    store.apply_all(commands);
    assert!(store.is_empty());

    settle(&mut world);
    store.apply_all(world.drain_render_commands());
    assert_eq!(store.len(), 5);
    assert!(store.contains(ChunkCoord::new(3, 0)));
}

#[test]
fn overflow_lands_in_neighbours_and_survives_regeneration() {
    let source = ChunkCoord::new(0, 0);
    let target = ChunkCoord::new(1, 0);
    let leaves = BlockType::LEAVES.id();
    let mut terrain = FlatTerrain::default();
    terrain.overflow.insert(
        source,
        HashMap::from([(
            target,
            vec![
                OverflowWrite { x: 0, y: 4, z: 0, block: leaves },
                OverflowWrite { x: 0, y: 3, z: 1, block: leaves },
            ],
        )]),
    );
    let terrain = Arc::new(terrain);
    let mut world = world_with(terrain.clone(), 1);

    world.request_stream(0, 0, 1);
    settle(&mut world);
    let east = world.chunk_data(target).unwrap();
    assert_eq!(east.get(0, 4, 0).unwrap(), leaves);
    assert_eq!(east.get(0, 3, 1).unwrap(), BlockType::GRASS.id(), "overflow never replaces blocks");
    assert_eq!(world.overflow().targets_of(source), vec![target]);

    // Drop the target while the source stays loaded, then bring it back.
    world.request_stream(-2, 0, 2);
    assert_eq!(world.chunk_state(target), None);
    assert!(world.chunk_state(source).is_some());
    world.request_stream(0, 0, 2);
    settle(&mut world);

    assert_eq!(terrain.generated(target), 2);
    assert_eq!(world.chunk_data(target).unwrap().get(0, 4, 0).unwrap(), leaves);
}

#[test]
fn set_block_reports_why_it_failed() {
    let mut world = world_with(Arc::new(FlatTerrain::default()), 0);
    world.request_stream(0, 0, 0);

    assert_eq!(
        world.set_block(1, 3, 1, BlockType::DIRT.id()),
        Err(WorldError::ChunkNotGenerated(ChunkCoord::new(0, 0)))
    );
    assert_eq!(world.get_block(1, 3, 1), None);

    settle(&mut world);
    assert_eq!(world.set_block(1, 3, 1, 200), Err(WorldError::UnknownBlock(200)));
    assert_eq!(
        world.set_block(1, -1, 1, BlockType::DIRT.id()),
        Err(WorldError::OutOfBounds { x: 1, y: -1, z: 1 })
    );
    assert_eq!(
        world.set_block(1, 8, 1, BlockType::DIRT.id()),
        Err(WorldError::OutOfBounds { x: 1, y: 8, z: 1 })
    );
    assert_eq!(
        world.set_block(100, 3, 100, BlockType::DIRT.id()),
        Err(WorldError::ChunkNotLoaded(ChunkCoord::new(6, 6)))
    );

    assert_eq!(world.get_block(1, 6, 1), Some(AIR));
    assert_eq!(world.get_block(1, 3, 1), Some(BlockType::GRASS.id()));
    assert_eq!(world.get_block(100, 3, 100), None);
    assert_eq!(world.get_block(1, 8, 1), None);
}

#[test]
fn stale_mesh_results_are_rebuilt() {
    let coord = ChunkCoord::new(0, 0);
    let mut world = world_with(Arc::new(FlatTerrain::default()), 0);
    world.request_stream(0, 0, 0);

    // Terrain runs, then its result is applied and the mesh job runs.
    world.pump();
    world.pump();
    assert_eq!(world.scheduler_stats().submitted_mesh, 1);
    world.set_block(5, 4, 5, BlockType::LOG.id()).unwrap();

    settle(&mut world);
    assert_eq!(world.scheduler_stats().submitted_mesh, 2);
    assert_eq!(uploads(&world.drain_render_commands()), vec![coord]);
    assert_eq!(world.meshed_version(coord), world.chunk_version(coord));
}

#[test]
fn late_neighbours_invalidate_meshed_chunks() {
    let coord = ChunkCoord::new(0, 0);
    let mut world = world_with(Arc::new(FlatTerrain::default()), 0);
    world.request_stream(0, 0, 0);
    settle(&mut world);

    let commands = world.drain_render_commands();
    let RenderCommand::Upload { mesh: alone, .. } = &commands[0] else {
        panic!("expected an upload");
    };
    // A grass top plus stone and grass bands on four open sides.
    assert_eq!(alone.quad_count(), 9);

    world.request_stream(0, 0, 1);
    settle(&mut world);
    let remeshed = world
        .drain_render_commands()
        .into_iter()
        .find_map(|command| match command {
            RenderCommand::Upload { coord: c, mesh } if c == coord => Some(mesh),
            _ => None,
        })
        .unwrap();
    assert_eq!(remeshed.quad_count(), 1, "covered sides are hidden");
    assert_eq!(world.meshed_version(coord), world.chunk_version(coord));
}

#[test]
fn evicted_neighbours_reopen_the_sides_they_covered() {
    let origin = ChunkCoord::new(0, 0);
    let mut world = world_with(Arc::new(FlatTerrain::default()), 1);
    let mut store = MeshStore::new();
    world.request_stream(0, 0, 1);
    settle(&mut world);
    store.apply_all(world.drain_render_commands());
    assert_eq!(store.get(origin).unwrap().quad_count(), 1);
    let before = world.chunk_version(origin).unwrap();

    // West, north and south leave the radius; east stays.
    world.request_stream(1, 0, 1);
    assert!(world.chunk_version(origin).unwrap() > before);
    settle(&mut world);
    store.apply_all(world.drain_render_commands());

    // The grass top plus a stone and a grass band on each of the three open sides.
    assert_eq!(store.get(origin).unwrap().quad_count(), 7);
    assert_eq!(world.meshed_version(origin), world.chunk_version(origin));
    assert!(world.is_settled());
}
