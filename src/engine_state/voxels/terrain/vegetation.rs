//! # Vegetation Pass
//!
//! Grows trees on grass after the column pass. A 2D noise field, seeded apart
//! from the terrain field so trees do not track terrain shape, is thresholded per
//! column. Selected grass columns get a 3 to 5 block trunk and a diamond canopy of
//! three layers whose Manhattan radius shrinks from 2 to 0 going up.
//!
//! Leaves never replace anything but air. Leaves that land outside the chunk are
//! collected per target chunk and returned to the caller.

use std::collections::HashMap;

use noise::{NoiseFn, Perlin};

use crate::engine_state::voxels::{
    block::{block_type::BlockType, AIR},
    chunk::{split_world_coordinate, ChunkCoord, ChunkError, VoxelChunk},
};

use super::OverflowWrite;

/// Added to the world seed for the tree noise field.
pub const TREE_SEED_OFFSET: u32 = 7919;
/// Noise value a column must exceed to grow a tree.
pub const TREE_THRESHOLD: f64 = 0.6;
/// Sampling scale of the tree field. Off-lattice so adjacent columns decorrelate.
pub const TREE_NOISE_SCALE: f64 = 0.731;
/// Shortest trunk.
pub const MIN_TRUNK_HEIGHT: usize = 3;
/// Number of distinct trunk heights.
pub const TRUNK_HEIGHT_VARIANTS: usize = 3;
/// Canopy radius per layer, bottom to top.
pub const CANOPY_RADII: [i32; 3] = [2, 1, 0];

/// Trunk height for a column whose tree noise exceeded the threshold.
fn trunk_height(sample: f64) -> usize {
    let t = ((sample - TREE_THRESHOLD) / (1.0 - TREE_THRESHOLD)).clamp(0.0, 0.999);
    MIN_TRUNK_HEIGHT + (t * TRUNK_HEIGHT_VARIANTS as f64) as usize
}

/// Places trees into `chunk` and returns leaves that belong to other chunks.
pub fn plant_trees(
    tree_noise: &Perlin,
    chunk: &mut VoxelChunk,
) -> Result<HashMap<ChunkCoord, Vec<OverflowWrite>>, ChunkError> {
    let dims = *chunk.dims();
    let coord = chunk.coord();
    let (origin_x, origin_z) = coord.origin(&dims);
    let grass = BlockType::GRASS.id();
    let log = BlockType::LOG.id();
    let leaves = BlockType::LEAVES.id();

    let mut overflow: HashMap<ChunkCoord, Vec<OverflowWrite>> = HashMap::new();

    for z in 0..dims.size_z {
        for x in 0..dims.size_x {
            let world_x = origin_x + x as i32;
            let world_z = origin_z + z as i32;
            let sample = tree_noise.get([
                world_x as f64 * TREE_NOISE_SCALE,
                world_z as f64 * TREE_NOISE_SCALE,
            ]);
            if sample <= TREE_THRESHOLD {
                continue;
            }

            let Some((ground, top_block)) = chunk.top_block(x, z) else {
                continue;
            };
            if top_block != grass {
                continue;
            }

            let height = trunk_height(sample);
            let trunk_top = ground + height;
            let canopy_top = trunk_top - 1 + CANOPY_RADII.len() - 1;
            if canopy_top >= dims.height {
                continue;
            }

            for y in ground + 1..=trunk_top {
                chunk.set(x, y, z, log)?;
            }

            for (layer, radius) in CANOPY_RADII.iter().enumerate() {
                let y = trunk_top - 1 + layer;
                for dz in -radius..=*radius {
                    for dx in -radius..=*radius {
                        if dx.abs() + dz.abs() > *radius {
                            continue;
                        }
                        let lx = x as i32 + dx;
                        let lz = z as i32 + dz;
                        if dims.contains(lx as i64, y as i64, lz as i64) {
                            let (lx, lz) = (lx as usize, lz as usize);
                            if chunk.get(lx, y, lz)? == AIR {
                                chunk.set(lx, y, lz, leaves)?;
                            }
                        } else {
                            let (target_x, local_x) = split_world_coordinate(lx, dims.size_x);
                            let (target_z, local_z) = split_world_coordinate(lz, dims.size_z);
                            overflow
                                .entry(coord.offset(target_x, target_z))
                                .or_default()
                                .push(OverflowWrite {
                                    x: local_x,
                                    y,
                                    z: local_z,
                                    block: leaves,
                                });
                        }
                    }
                }
            }
        }
    }

    Ok(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::{
        chunk::ChunkDimensions,
        terrain::{TerrainGenerator, TerrainSource},
    };

    #[test]
    fn trunk_heights_stay_in_range() {
        assert_eq!(trunk_height(TREE_THRESHOLD), 3);
        assert_eq!(trunk_height(0.8), 4);
        assert_eq!(trunk_height(1.0), 5);
        assert_eq!(trunk_height(2.0), 5);
    }

    /// Flat grass at y = 10 so every selected column grows a tree.
    fn flat_grass(coord: ChunkCoord, dims: ChunkDimensions) -> VoxelChunk {
        let mut chunk = VoxelChunk::empty(coord, dims);
        for z in 0..dims.size_z {
            for x in 0..dims.size_x {
                for y in 0..10 {
                    chunk.set(x, y, z, BlockType::DIRT.id()).unwrap();
                }
                chunk.set(x, 10, z, BlockType::GRASS.id()).unwrap();
            }
        }
        chunk
    }

    #[test]
    fn trees_stand_on_grass_and_spill_into_neighbours() {
        let dims = ChunkDimensions {
            size_x: 16,
            size_z: 16,
            height: 32,
        };
        let noise = Perlin::new(TREE_SEED_OFFSET);
        let mut planted = 0;
        let mut spilled = 0;

        for cx in -2..2 {
            for cz in -2..2 {
                let coord = ChunkCoord::new(cx, cz);
                let mut chunk = flat_grass(coord, dims);
                let overflow = plant_trees(&noise, &mut chunk).unwrap();

                for z in 0..16 {
                    for x in 0..16 {
                        if chunk.at(x, 11, z) == BlockType::LOG.id() {
                            planted += 1;
                            assert_eq!(chunk.at(x, 10, z), BlockType::GRASS.id());
                        }
                    }
                }
                for (target, writes) in &overflow {
                    assert_ne!(*target, coord);
                    assert!(coord.distance_squared(*target) <= 2);
                    for write in writes {
                        assert!(write.x < 16 && write.z < 16);
                        assert_eq!(write.block, BlockType::LEAVES.id());
                    }
                    spilled += writes.len();
                }
            }
        }

        assert!(planted > 0, "no trees were planted");
        assert!(spilled > 0, "no canopy crossed a chunk edge");
    }

    #[test]
    fn trees_never_grow_through_the_ceiling() {
        let dims = ChunkDimensions {
            size_x: 16,
            size_z: 16,
            height: 13,
        };
        let mut chunk = flat_grass(ChunkCoord::new(0, 0), dims);
        let overflow = plant_trees(&Perlin::new(TREE_SEED_OFFSET), &mut chunk).unwrap();
        assert!(overflow.is_empty());
        assert_eq!(chunk.count_non_air(), 16 * 16 * 11);
    }

    #[test]
    fn generated_trunks_sit_on_grass() {
        let generator = TerrainGenerator::new(42);
        let dims = ChunkDimensions::default();
        for cx in 0..3 {
            let terrain = generator.generate(ChunkCoord::new(cx, 0), dims).unwrap();
            let chunk = &terrain.chunk;
            for z in 0..16 {
                for x in 0..16 {
                    for y in 1..dims.height {
                        let below = chunk.at(x, y - 1, z);
                        if chunk.at(x, y, z) == BlockType::LOG.id() && below != BlockType::LOG.id() {
                            assert_eq!(below, BlockType::GRASS.id());
                        }
                    }
                }
            }
        }
    }
}
