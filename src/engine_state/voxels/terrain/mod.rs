//! # Terrain Module
//!
//! Deterministic procedural terrain. A chunk is generated in two passes:
//!
//! 1. **Column pass**: each column is scanned top-down through a 3D Perlin density
//!    field biased towards solid below the water level. The first solid cell of a
//!    run becomes the surface, the next few cells the subsoil, and anything
//!    deeper is stone. Empty cells at or below the water level fill with water.
//! 2. **Vegetation pass** (see [`vegetation`]): a decorrelated 2D noise field picks
//!    grass columns that grow a tree.
//!
//! Generation depends only on `(seed, chunk coordinate, dimensions)`. Leaves that
//! spill past the chunk edge are returned as an overflow write-set keyed by the
//! neighbouring chunk instead of being dropped.

use std::collections::HashMap;

use noise::{NoiseFn, Perlin};
use thiserror::Error;

use super::{
    block::{block_type::BlockType, BlockId, AIR},
    chunk::{ChunkCoord, ChunkDimensions, ChunkError, VoxelChunk},
};

pub mod vegetation;

/// Highest y that fills with water.
pub const WATER_LEVEL: usize = 64;
/// World-space distance over which the density field varies smoothly.
pub const NOISE_SMOOTHNESS: f64 = 25.0;
/// Extra density per block of height below the water level.
pub const DEEP_DENSITY_GAIN: f64 = 0.006;
/// Surface plus subsoil layers above stone.
pub const TOPSOIL_DEPTH: usize = 4;
/// Surfaces at or below this height are beach sand.
pub const BEACH_LEVEL: usize = WATER_LEVEL + 1;

/// Errors raised while generating a chunk.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// One of the chunk extents was zero.
    #[error("invalid chunk dimensions {0:?}")]
    InvalidDimensions(ChunkDimensions),

    /// The chunk buffer could not be built.
    #[error(transparent)]
    Chunk(#[from] ChunkError),
}

/// A single block destined for another chunk, in that chunk's local coordinates.
///
/// Overflow writes only ever fill air.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OverflowWrite {
    /// Local X in the target chunk
    pub x: usize,
    /// Local Y in the target chunk
    pub y: usize,
    /// Local Z in the target chunk
    pub z: usize,
    /// Block to place
    pub block: BlockId,
}

/// Output of one terrain job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedTerrain {
    /// The populated chunk
    pub chunk: VoxelChunk,
    /// Writes that belong to neighbouring chunks
    pub overflow: HashMap<ChunkCoord, Vec<OverflowWrite>>,
}

/// Anything that can fill a chunk. Implementations must be deterministic.
pub trait TerrainSource: Send + Sync {
    /// Produces the blocks of one chunk.
    fn generate(
        &self,
        coord: ChunkCoord,
        dims: ChunkDimensions,
    ) -> Result<GeneratedTerrain, GenerationError>;
}

/// Classifies solid cells by how far below the surface of their run they are.
fn soil_block(depth: usize, surface: BlockId) -> BlockId {
    let sand = BlockType::SAND.id();
    match depth {
        0 => surface,
        d if d < TOPSOIL_DEPTH && surface == sand => sand,
        d if d < TOPSOIL_DEPTH => BlockType::DIRT.id(),
        _ => BlockType::STONE.id(),
    }
}

/// The default noise-driven world generator.
#[derive(Clone, Debug)]
pub struct TerrainGenerator {
    seed: u32,
    terrain_noise: Perlin,
    tree_noise: Perlin,
}

impl TerrainGenerator {
    /// Creates a generator for a world seed.
    pub fn new(seed: u32) -> Self {
        TerrainGenerator {
            seed,
            terrain_noise: Perlin::new(seed),
            tree_noise: Perlin::new(seed.wrapping_add(vegetation::TREE_SEED_OFFSET)),
        }
    }

    /// The world seed.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Samples the biased density field at a world position. Positive is solid.
    pub fn density(&self, world_x: i32, y: usize, world_z: i32) -> f64 {
        let mut density = self.terrain_noise.get([
            world_x as f64 / NOISE_SMOOTHNESS,
            y as f64 / NOISE_SMOOTHNESS,
            world_z as f64 / NOISE_SMOOTHNESS,
        ]);
        density += (WATER_LEVEL as f64 - y as f64) / WATER_LEVEL as f64;
        if y < WATER_LEVEL {
            density += y as f64 * DEEP_DENSITY_GAIN;
        }
        density
    }

    fn fill_columns(&self, chunk: &mut VoxelChunk) -> Result<(), ChunkError> {
        let dims = *chunk.dims();
        let (origin_x, origin_z) = chunk.coord().origin(&dims);

        for z in 0..dims.size_z {
            for x in 0..dims.size_x {
                let world_x = origin_x + x as i32;
                let world_z = origin_z + z as i32;

                // (surface block, depth below it) of the current solid run
                let mut run: Option<(BlockId, usize)> = None;
                let mut above = AIR;

                for y in (0..dims.height).rev() {
                    let block = if self.density(world_x, y, world_z) >= 0.0 {
                        let (surface, depth) = match run {
                            Some((surface, depth)) => (surface, depth + 1),
                            None if y <= BEACH_LEVEL || above == BlockType::WATER.id() => {
                                (BlockType::SAND.id(), 0)
                            }
                            None => (BlockType::GRASS.id(), 0),
                        };
                        run = Some((surface, depth));
                        soil_block(depth, surface)
                    } else {
                        run = None;
                        if y <= WATER_LEVEL {
                            BlockType::WATER.id()
                        } else {
                            AIR
                        }
                    };

                    if block != AIR {
                        chunk.set(x, y, z, block)?;
                    }
                    above = block;
                }
            }
        }
        Ok(())
    }
}

impl TerrainSource for TerrainGenerator {
    fn generate(
        &self,
        coord: ChunkCoord,
        dims: ChunkDimensions,
    ) -> Result<GeneratedTerrain, GenerationError> {
        if dims.volume() == 0 {
            return Err(GenerationError::InvalidDimensions(dims));
        }

        let mut chunk = VoxelChunk::empty(coord, dims);
        self.fill_columns(&mut chunk)?;
        let overflow = vegetation::plant_trees(&self.tree_noise, &mut chunk)?;

        Ok(GeneratedTerrain { chunk, overflow })
    }
}
