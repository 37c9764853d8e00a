//! Chunk lifecycle transitions: applying job results, mesh eligibility and retries.

use std::sync::Arc;

use log::{debug, error, warn};

use crate::engine_state::{
    rendering::{
        meshing::{ChunkMesh, ChunkNeighborhood},
        tasks::chunk_mesh_generation_task::ChunkMeshGenerationTask,
        RenderCommand,
    },
    task_management::{task::TaskError, TaskCompletion, TaskKind},
    voxels::{
        chunk::{ChunkCoord, ChunkState},
        tasks::chunk_generation_task::ChunkGenerationTask,
        terrain::GeneratedTerrain,
    },
};

use super::{overflow, ChunkEntry, World};

impl World {
    /// Applies every finished job that is still current for its chunk.
    pub(super) fn process_completed_tasks(&mut self) {
        for completion in self.task_manager.process_completed_tasks() {
            self.handle_completion(completion);
        }
    }

    fn handle_completion(&mut self, completion: TaskCompletion) {
        let TaskCompletion { handle, outcome } = completion;
        let coord = handle.coord();
        let Some(entry) = self.chunks.get_mut(&coord) else {
            debug!("Dropping {} result for unloaded chunk {coord}", handle.kind());
            return;
        };

        let current = match handle.kind() {
            TaskKind::Terrain => &mut entry.generation_job,
            TaskKind::Mesh => &mut entry.mesh_job,
        };
        if current.as_ref() != Some(&handle) {
            debug!(
                "Dropping stale {} task {} for chunk {coord}",
                handle.kind(),
                handle.id()
            );
            return;
        }
        *current = None;

        match outcome {
            Ok(result) => result.handle_result(self),
            Err(error) => self.on_task_failed(handle.kind(), coord, error),
        }
    }

    /// Submits a terrain job for a tracked chunk.
    pub(super) fn submit_generation(&mut self, coord: ChunkCoord) {
        let task = ChunkGenerationTask::new(self.terrain.clone(), coord, self.config.chunk);
        let handle = self
            .task_manager
            .submit(TaskKind::Terrain, coord, Box::new(task));
        if let Some(entry) = self.chunks.get_mut(&coord) {
            entry.generation_attempts += 1;
            entry.generation_job = Some(handle);
        }
    }

    /// Stores generated terrain and merges overflow in both directions.
    pub(crate) fn apply_generated(&mut self, terrain: GeneratedTerrain) {
        let GeneratedTerrain {
            mut chunk,
            overflow: produced,
        } = terrain;
        let coord = chunk.coord();
        if self.chunk_state(coord) != Some(ChunkState::Generating) {
            debug!("Ignoring terrain for chunk {coord}: not awaiting generation");
            return;
        }

        // Writes from already generated neighbours land before the chunk is visible.
        let incoming = self.overflow.writes_for(coord);
        if let Err(error) = overflow::apply_writes(&mut chunk, &incoming) {
            warn!("Dropped overflow into chunk {coord}: {error}");
        }

        if let Some(entry) = self.chunks.get_mut(&coord) {
            entry.data = Some(Arc::new(chunk));
            entry.state = ChunkState::Generated;
            entry.version += 1;
            entry.generation_attempts = 0;
        }
        debug!("Chunk {coord} generated");

        let mut dirty = vec![coord];

        self.overflow.record(coord, produced);
        for target in self.overflow.targets_of(coord) {
            let writes = self.overflow.writes_from(coord, target).to_vec();
            let Some(data) = self
                .chunks
                .get_mut(&target)
                .and_then(|entry| entry.data.as_mut())
            else {
                continue;
            };
            let result = overflow::apply_writes(Arc::make_mut(data), &writes);
            match result {
                Ok(changed) if !changed.is_empty() => {
                    dirty.extend(self.mark_columns_dirty(target, &changed));
                }
                Ok(_) => {}
                Err(error) => warn!("Dropped overflow from {coord} into {target}: {error}"),
            }
        }

        // Neighbours meshed against an empty edge must be rebuilt.
        for neighbor in coord.neighbors() {
            if let Some(entry) = self.chunks.get_mut(&neighbor) {
                if entry.meshed_version.is_some() || entry.mesh_job.is_some() {
                    entry.version += 1;
                }
            }
            dirty.push(neighbor);
        }

        dirty.sort();
        dirty.dedup();
        for candidate in dirty {
            self.maybe_mesh(candidate);
        }
    }

    /// Whether a chunk may be meshed now.
    ///
    /// The chunk must be generated, and each lateral neighbour must either be
    /// generated or be untracked and outside the streaming radius. An untracked
    /// neighbour outside the radius will never load, so its side is meshed as air.
    pub fn is_mesh_eligible(&self, coord: ChunkCoord) -> bool {
        if !self.chunks.get(&coord).is_some_and(ChunkEntry::has_data) {
            return false;
        }
        coord
            .neighbors()
            .iter()
            .all(|neighbor| match self.chunks.get(neighbor) {
                Some(entry) => entry.has_data(),
                None => !self.in_radius(*neighbor),
            })
    }

    /// Submits a mesh job if the chunk is eligible, idle and stale.
    pub(super) fn maybe_mesh(&mut self, coord: ChunkCoord) {
        if !self.is_mesh_eligible(coord) {
            return;
        }
        let neighbors = coord
            .neighbors()
            .map(|neighbor| self.chunks.get(&neighbor).and_then(|entry| entry.data.clone()));

        let Some(entry) = self.chunks.get_mut(&coord) else {
            return;
        };
        if entry.mesh_job.is_some() || entry.meshed_version == Some(entry.version) {
            return;
        }
        let Some(center) = entry.data.clone() else {
            return;
        };

        let task = ChunkMeshGenerationTask::new(
            self.registry.clone(),
            ChunkNeighborhood::new(center, neighbors),
            entry.version,
        );
        let handle = self.task_manager.submit(TaskKind::Mesh, coord, Box::new(task));
        debug!("Meshing chunk {coord} at version {}", entry.version);
        entry.mesh_job = Some(handle);
    }

    /// Publishes a finished mesh, or re-meshes if the chunk changed meanwhile.
    pub(crate) fn apply_mesh(&mut self, coord: ChunkCoord, version: u64, mesh: ChunkMesh) {
        let Some(entry) = self.chunks.get_mut(&coord) else {
            return;
        };
        if entry.version != version {
            debug!(
                "Mesh for chunk {coord} is stale (built from v{version}, now v{})",
                entry.version
            );
            self.maybe_mesh(coord);
            return;
        }

        entry.meshed_version = Some(version);
        entry.state = ChunkState::Meshed;
        entry.uploaded = true;
        debug!("Chunk {coord} meshed: {} quads", mesh.quad_count());
        self.render_commands.push(RenderCommand::Upload { coord, mesh });
    }

    fn on_task_failed(&mut self, kind: TaskKind, coord: ChunkCoord, error: TaskError) {
        match kind {
            TaskKind::Terrain => {
                let attempts = self
                    .chunks
                    .get(&coord)
                    .map_or(0, |entry| entry.generation_attempts);
                if attempts < self.config.max_generation_attempts {
                    warn!("Generating chunk {coord} failed (attempt {attempts}), retrying: {error}");
                    self.submit_generation(coord);
                } else {
                    error!("Generating chunk {coord} failed after {attempts} attempts: {error}");
                }
            }
            TaskKind::Mesh => {
                error!("Meshing chunk {coord} failed: {error}");
            }
        }
    }

    /// Bumps the version of a chunk and of the lateral neighbours sharing the given columns.
    ///
    /// # Returns
    /// The generated chunks that were bumped, sorted.
    pub(super) fn mark_columns_dirty(
        &mut self,
        coord: ChunkCoord,
        columns: &[(usize, usize)],
    ) -> Vec<ChunkCoord> {
        let dims = self.config.chunk;
        let mut dirty = vec![coord];
        for &(x, z) in columns {
            if x == 0 {
                dirty.push(coord.offset(-1, 0));
            }
            if x + 1 == dims.size_x {
                dirty.push(coord.offset(1, 0));
            }
            if z == 0 {
                dirty.push(coord.offset(0, -1));
            }
            if z + 1 == dims.size_z {
                dirty.push(coord.offset(0, 1));
            }
        }
        dirty.sort();
        dirty.dedup();
        dirty.retain(|candidate| self.chunks.get(candidate).is_some_and(ChunkEntry::has_data));

        for candidate in &dirty {
            if let Some(entry) = self.chunks.get_mut(candidate) {
                entry.version += 1;
            }
        }
        dirty
    }
}
