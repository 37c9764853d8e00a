//! # Chunk Module
//!
//! This module provides the `VoxelChunk` struct: a dense, fixed-size column of
//! block ids identified by its position on the 2D chunk tiling.
//!
//! ## Memory Layout
//!
//! Blocks are stored in one flat buffer of `size_x * size_z * height` ids, indexed
//! as `x + size_x * (y + height * z)`. X varies fastest, then Y, then Z, so a
//! vertical scan of one column strides by `size_x`.
//!
//! ## Bounds
//!
//! Local coordinates outside the chunk are a programming error. The checked
//! accessors return [`ChunkError::OutOfBounds`] and the unchecked [`VoxelChunk::at`]
//! panics. Queries that may leave the chunk must go through the world.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::block::{BlockId, AIR};

mod chunk_coord;

pub use chunk_coord::{split_world_coordinate, ChunkCoord};

/// Default horizontal extent of a chunk in blocks.
pub const DEFAULT_CHUNK_SIZE: usize = 16;
/// Default vertical extent of a chunk in blocks.
pub const DEFAULT_CHUNK_HEIGHT: usize = 300;

/// Errors raised by local chunk access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// A local coordinate fell outside the chunk.
    #[error("local coordinate ({x}, {y}, {z}) is outside the chunk")]
    OutOfBounds {
        /// Requested local X
        x: i64,
        /// Requested local Y
        y: i64,
        /// Requested local Z
        z: i64,
    },
    /// A buffer handed to the chunk had the wrong length.
    #[error("chunk buffer holds {actual} blocks, expected {expected}")]
    BufferSize {
        /// Volume implied by the chunk dimensions
        expected: usize,
        /// Length of the supplied buffer
        actual: usize,
    },
}

/// Extents of every chunk in the world.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkDimensions {
    /// Blocks along X
    pub size_x: usize,
    /// Blocks along Z
    pub size_z: usize,
    /// Blocks along Y
    pub height: usize,
}

impl Default for ChunkDimensions {
    fn default() -> Self {
        ChunkDimensions {
            size_x: DEFAULT_CHUNK_SIZE,
            size_z: DEFAULT_CHUNK_SIZE,
            height: DEFAULT_CHUNK_HEIGHT,
        }
    }
}

impl ChunkDimensions {
    /// Total number of blocks in one chunk.
    pub fn volume(&self) -> usize {
        self.size_x * self.size_z * self.height
    }

    /// Extents in sweep-axis order `[x, y, z]`.
    pub fn as_array(&self) -> [usize; 3] {
        [self.size_x, self.height, self.size_z]
    }

    /// Whether a signed local coordinate lies inside the chunk.
    pub fn contains(&self, x: i64, y: i64, z: i64) -> bool {
        (0..self.size_x as i64).contains(&x)
            && (0..self.height as i64).contains(&y)
            && (0..self.size_z as i64).contains(&z)
    }

    /// Flat buffer index of an in-range local coordinate.
    pub fn index(&self, x: usize, y: usize, z: usize) -> Result<usize, ChunkError> {
        if x >= self.size_x || y >= self.height || z >= self.size_z {
            return Err(ChunkError::OutOfBounds {
                x: x as i64,
                y: y as i64,
                z: z as i64,
            });
        }
        Ok(x + self.size_x * (y + self.height * z))
    }
}

/// Lifecycle of a tracked chunk. Variants are ordered; a chunk only moves forward.
///
/// `Unloaded` has no variant: an unloaded chunk is simply absent from the world.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChunkState {
    /// A terrain job has been requested and its buffer is not stored yet.
    Generating,
    /// Block data is present.
    Generated,
    /// Geometry has been produced at least once.
    Meshed,
}

/// A fixed-size column of block ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelChunk {
    coord: ChunkCoord,
    dims: ChunkDimensions,
    blocks: Vec<BlockId>,
}

impl VoxelChunk {
    /// Creates a chunk filled with air.
    pub fn empty(coord: ChunkCoord, dims: ChunkDimensions) -> Self {
        VoxelChunk {
            coord,
            dims,
            blocks: vec![AIR; dims.volume()],
        }
    }

    /// Wraps an existing flat buffer.
    ///
    /// # Errors
    /// Returns [`ChunkError::BufferSize`] when the buffer length does not match `dims`.
    pub fn from_blocks(
        coord: ChunkCoord,
        dims: ChunkDimensions,
        blocks: Vec<BlockId>,
    ) -> Result<Self, ChunkError> {
        if blocks.len() != dims.volume() {
            return Err(ChunkError::BufferSize {
                expected: dims.volume(),
                actual: blocks.len(),
            });
        }
        Ok(VoxelChunk {
            coord,
            dims,
            blocks,
        })
    }

    /// The chunk's position on the tiling.
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// The chunk's extents.
    pub fn dims(&self) -> &ChunkDimensions {
        &self.dims
    }

    /// The flat block buffer.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Reads a block.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Result<BlockId, ChunkError> {
        Ok(self.blocks[self.dims.index(x, y, z)?])
    }

    /// Writes a block and returns the id it replaced.
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: BlockId) -> Result<BlockId, ChunkError> {
        let index = self.dims.index(x, y, z)?;
        Ok(std::mem::replace(&mut self.blocks[index], block))
    }

    /// Reads a block whose coordinate is known to be inside the chunk.
    ///
    /// # Panics
    /// Panics if the coordinate lies outside the chunk.
    #[inline]
    pub fn at(&self, x: usize, y: usize, z: usize) -> BlockId {
        match self.dims.index(x, y, z) {
            Ok(index) => self.blocks[index],
            Err(error) => panic!("chunk {}: {error}", self.coord),
        }
    }

    /// Highest non-air block in a column, if any.
    pub fn top_block(&self, x: usize, z: usize) -> Option<(usize, BlockId)> {
        (0..self.dims.height)
            .rev()
            .map(|y| (y, self.at(x, y, z)))
            .find(|(_, block)| *block != AIR)
    }

    /// Number of non-air blocks.
    pub fn count_non_air(&self) -> usize {
        self.blocks.iter().filter(|block| **block != AIR).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_dims() -> ChunkDimensions {
        ChunkDimensions {
            size_x: 4,
            size_z: 3,
            height: 5,
        }
    }

    #[test]
    fn index_layout_is_x_then_y_then_z() {
        let dims = small_dims();
        assert_eq!(dims.index(0, 0, 0), Ok(0));
        assert_eq!(dims.index(1, 0, 0), Ok(1));
        assert_eq!(dims.index(0, 1, 0), Ok(4));
        assert_eq!(dims.index(0, 0, 1), Ok(20));
        assert_eq!(dims.index(3, 4, 2), Ok(dims.volume() - 1));
    }

    #[test]
    fn out_of_range_access_is_an_error() {
        let mut chunk = VoxelChunk::empty(ChunkCoord::new(0, 0), small_dims());
        assert_eq!(
            chunk.get(4, 0, 0),
            Err(ChunkError::OutOfBounds { x: 4, y: 0, z: 0 })
        );
        assert!(chunk.set(0, 5, 0, 1).is_err());
        assert!(chunk.get(0, 0, 3).is_err());
    }

    #[test]
    #[should_panic]
    fn unchecked_access_fails_fast() {
        let chunk = VoxelChunk::empty(ChunkCoord::new(0, 0), small_dims());
        chunk.at(0, 0, 3);
    }

    #[test]
    fn set_returns_previous_block() {
        let mut chunk = VoxelChunk::empty(ChunkCoord::new(2, 2), small_dims());
        assert_eq!(chunk.set(1, 2, 1, 3), Ok(AIR));
        assert_eq!(chunk.set(1, 2, 1, 4), Ok(3));
        assert_eq!(chunk.get(1, 2, 1), Ok(4));
        assert_eq!(chunk.count_non_air(), 1);
        assert_eq!(chunk.top_block(1, 1), Some((2, 4)));
        assert_eq!(chunk.top_block(0, 0), None);
    }

    #[test]
    fn from_blocks_checks_buffer_length() {
        let dims = small_dims();
        let result = VoxelChunk::from_blocks(ChunkCoord::new(0, 0), dims, vec![0; 7]);
        assert_eq!(
            result,
            Err(ChunkError::BufferSize {
                expected: 60,
                actual: 7
            })
        );
    }

    #[test]
    fn states_are_ordered() {
        assert!(ChunkState::Generating < ChunkState::Generated);
        assert!(ChunkState::Generated < ChunkState::Meshed);
    }
}
