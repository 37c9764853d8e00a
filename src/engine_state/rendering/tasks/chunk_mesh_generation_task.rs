//! Task for meshing a chunk in a background thread.
//!
//! The task owns a snapshot of the chunk and its lateral neighbours, so the
//! world can keep editing while the mesher runs. The data version the snapshot
//! was taken at travels with the result; the world drops results that no longer
//! match.
//!
//! Each worker thread keeps one `GreedyMesher`, so its transparency table and
//! scratch mask survive from one job to the next.

use std::cell::RefCell;
use std::sync::Arc;

use log::debug;
use web_time::Instant;

use crate::engine_state::{
    rendering::meshing::{ChunkMesh, ChunkNeighborhood, GreedyMesher},
    task_management::task::{Task, TaskError, TaskResult},
    voxels::{block::BlockRegistry, chunk::ChunkCoord, world::World},
};

thread_local! {
    /// The mesher owned by the current worker thread
    static MESHER: RefCell<Option<GreedyMesher>> = const { RefCell::new(None) };
}

/// Runs `f` with this thread's mesher, rebuilding it if it serves another registry.
fn with_mesher<R>(registry: &Arc<BlockRegistry>, f: impl FnOnce(&mut GreedyMesher) -> R) -> R {
    MESHER.with(|slot| {
        let mut slot = slot.borrow_mut();
        if !slot.as_ref().is_some_and(|mesher| mesher.serves(registry)) {
            *slot = None;
        }
        let mesher = slot.get_or_insert_with(|| GreedyMesher::new(registry.clone()));
        f(mesher)
    })
}

/// A task that builds the geometry of one chunk.
pub struct ChunkMeshGenerationTask {
    /// Block table used for transparency and textures
    registry: Arc<BlockRegistry>,
    /// The chunk and its neighbours at `version`
    neighborhood: ChunkNeighborhood,
    /// Data version of the snapshot
    version: u64,
}

impl ChunkMeshGenerationTask {
    /// Creates a new chunk mesh generation task.
    ///
    /// # Arguments
    /// * `registry` - Block table
    /// * `neighborhood` - Snapshot of the chunk and its four lateral neighbours
    /// * `version` - Data version of the snapshot
    pub fn new(registry: Arc<BlockRegistry>, neighborhood: ChunkNeighborhood, version: u64) -> Self {
        ChunkMeshGenerationTask {
            registry,
            neighborhood,
            version,
        }
    }
}

impl Task for ChunkMeshGenerationTask {
    fn process(&self) -> Result<Box<dyn TaskResult + Send>, TaskError> {
        let start = Instant::now();
        let mesh = with_mesher(&self.registry, |mesher| mesher.mesh_chunk(&self.neighborhood));
        let coord = self.neighborhood.coord();
        debug!(
            "Meshed chunk {coord} v{} in {:?}: {} opaque, {} transparent quads",
            self.version,
            start.elapsed(),
            mesh.opaque.quads.len(),
            mesh.transparent.quads.len()
        );
        Ok(Box::new(ChunkMeshGenerationTaskResult {
            coord,
            version: self.version,
            mesh,
        }))
    }
}

/// The result of a chunk mesh generation task.
pub struct ChunkMeshGenerationTaskResult {
    coord: ChunkCoord,
    version: u64,
    mesh: ChunkMesh,
}

impl TaskResult for ChunkMeshGenerationTaskResult {
    /// Hands the mesh to the world, which publishes it if the chunk is unchanged.
    fn handle_result(self: Box<Self>, world: &mut World) {
        world.apply_mesh(self.coord, self.version, self.mesh);
    }
}
