//! # Chunk Coordinate Module
//!
//! Chunks tile the world as 2D columns. This module converts between world block
//! coordinates and (chunk coordinate, local coordinate) pairs.
//!
//! Translation always uses floored division and a non-negative remainder, so
//! `-1` belongs to chunk `-1` at local `size - 1` rather than to chunk `0`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ChunkDimensions;

/// Integer position of a chunk column on the 2D tiling.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// Chunk index along world X
    pub x: i32,
    /// Chunk index along world Z
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a chunk coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        ChunkCoord { x, z }
    }

    /// Returns the coordinate shifted by whole chunks.
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        ChunkCoord::new(self.x + dx, self.z + dz)
    }

    /// The four laterally adjacent chunks, in the order +X, -X, +Z, -Z.
    pub fn neighbors(self) -> [ChunkCoord; 4] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, 1),
            self.offset(0, -1),
        ]
    }

    /// Squared euclidean distance in chunk units.
    pub fn distance_squared(self, other: ChunkCoord) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }

    /// Resolves the chunk holding a world block column and the local column inside it.
    ///
    /// # Returns
    /// `(chunk, local_x, local_z)` with both local values in `[0, size)`.
    pub fn from_world(world_x: i32, world_z: i32, dims: &ChunkDimensions) -> (Self, usize, usize) {
        let (chunk_x, local_x) = split_world_coordinate(world_x, dims.size_x);
        let (chunk_z, local_z) = split_world_coordinate(world_z, dims.size_z);
        (ChunkCoord::new(chunk_x, chunk_z), local_x, local_z)
    }

    /// World coordinate of this chunk's local origin column.
    pub fn origin(self, dims: &ChunkDimensions) -> (i32, i32) {
        (
            self.x * dims.size_x as i32,
            self.z * dims.size_z as i32,
        )
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Splits one world axis value into (chunk index, local index).
///
/// `size` is the chunk extent on that axis and must be non-zero.
pub fn split_world_coordinate(world: i32, size: usize) -> (i32, usize) {
    let size = size as i32;
    (world.div_euclid(size), world.rem_euclid(size) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_coordinates_floor_into_previous_chunk() {
        assert_eq!(split_world_coordinate(-1, 16), (-1, 15));
        assert_eq!(split_world_coordinate(-16, 16), (-1, 0));
        assert_eq!(split_world_coordinate(-17, 16), (-2, 15));
        assert_eq!(split_world_coordinate(0, 16), (0, 0));
        assert_eq!(split_world_coordinate(16, 16), (1, 0));
        assert_eq!(split_world_coordinate(31, 16), (1, 15));
    }

    #[test]
    fn from_world_uses_independent_axis_sizes() {
        let dims = ChunkDimensions {
            size_x: 8,
            size_z: 4,
            height: 32,
        };
        let (coord, local_x, local_z) = ChunkCoord::from_world(9, -5, &dims);
        assert_eq!(coord, ChunkCoord::new(1, -2));
        assert_eq!((local_x, local_z), (1, 3));
        assert_eq!(coord.origin(&dims), (8, -8));
    }

    #[test]
    fn neighbors_are_face_adjacent() {
        let center = ChunkCoord::new(3, -2);
        for neighbor in center.neighbors() {
            assert_eq!(center.distance_squared(neighbor), 1);
        }
    }
}
