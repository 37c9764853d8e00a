//! Streaming: which chunks stay loaded around the viewer.

use log::debug;

use crate::engine_state::{rendering::RenderCommand, voxels::chunk::ChunkCoord};

use super::{ChunkEntry, World};

/// Every coordinate within a circular radius of `center`, nearest first.
///
/// Ties are broken by coordinate so the order is deterministic.
pub fn chunks_in_radius(center: ChunkCoord, radius: u32) -> Vec<ChunkCoord> {
    let r = radius as i32;
    let limit = radius as i64 * radius as i64;
    let mut coords: Vec<ChunkCoord> = (-r..=r)
        .flat_map(|dz| (-r..=r).map(move |dx| center.offset(dx, dz)))
        .filter(|coord| center.distance_squared(*coord) <= limit)
        .collect();
    coords.sort_by_key(|coord| (center.distance_squared(*coord), *coord));
    coords
}

impl World {
    /// Moves the streaming center.
    ///
    /// Untracked coordinates within `radius` are tracked in `Generating` state and
    /// get a terrain job, nearest first. Tracked chunks outside `radius` are evicted.
    pub fn request_stream(&mut self, center_x: i32, center_z: i32, radius: u32) {
        let center = ChunkCoord::new(center_x, center_z);
        self.center = Some(center);
        self.radius = radius;

        let mut evicted: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|coord| !self.in_radius(**coord))
            .copied()
            .collect();
        evicted.sort();
        for coord in &evicted {
            self.evict(*coord);
        }

        let mut added = 0;
        for coord in chunks_in_radius(center, radius) {
            if self.chunks.contains_key(&coord) {
                continue;
            }
            self.chunks.insert(coord, ChunkEntry::new());
            self.submit_generation(coord);
            added += 1;
        }

        // A neighbour that just left the radius no longer blocks meshing, and
        // chunks meshed against its blocks now face air on that side.
        for coord in evicted {
            for neighbor in coord.neighbors() {
                if let Some(entry) = self.chunks.get_mut(&neighbor) {
                    if entry.meshed_version.is_some() || entry.mesh_job.is_some() {
                        entry.version += 1;
                    }
                }
                self.maybe_mesh(neighbor);
            }
        }

        debug!(
            "Streaming around {center} (radius {radius}): {added} added, {} loaded",
            self.chunks.len()
        );
    }

    /// Whether a coordinate is within the current streaming radius.
    ///
    /// With no streaming center every coordinate is outside.
    pub fn in_radius(&self, coord: ChunkCoord) -> bool {
        self.center.is_some_and(|center| {
            center.distance_squared(coord) <= self.radius as i64 * self.radius as i64
        })
    }

    /// Forgets a chunk, cancels its jobs and releases its geometry.
    pub(super) fn evict(&mut self, coord: ChunkCoord) {
        let Some(entry) = self.chunks.remove(&coord) else {
            return;
        };
        if let Some(job) = &entry.generation_job {
            self.task_manager.cancel(job);
        }
        if let Some(job) = &entry.mesh_job {
            self.task_manager.cancel(job);
        }
        if entry.uploaded {
            self.render_commands.push(RenderCommand::Dispose { coord });
        }
        self.overflow.forget_source(coord);
        debug!("Evicted chunk {coord} ({:?})", entry.state);
    }
}
