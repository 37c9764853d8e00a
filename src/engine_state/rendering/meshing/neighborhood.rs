//! Snapshot of a chunk and its four lateral neighbours, as seen by the mesher.

use std::sync::Arc;

use bitvec::vec::BitVec;

use crate::engine_state::voxels::{
    block::{BlockId, BlockRegistry, AIR},
    chunk::{ChunkCoord, ChunkDimensions, VoxelChunk},
};

/// Index of the +X neighbour in [`ChunkNeighborhood::new`]'s array.
pub const POS_X: usize = 0;
/// Index of the -X neighbour.
pub const NEG_X: usize = 1;
/// Index of the +Z neighbour.
pub const POS_Z: usize = 2;
/// Index of the -Z neighbour.
pub const NEG_Z: usize = 3;

/// Immutable block data a mesh job reads.
///
/// Missing neighbours, diagonal chunks and heights outside the world all read
/// as air.
#[derive(Clone, Debug)]
pub struct ChunkNeighborhood {
    center: Arc<VoxelChunk>,
    neighbors: [Option<Arc<VoxelChunk>>; 4],
}

impl ChunkNeighborhood {
    /// Wraps a chunk and its neighbours in the order +X, -X, +Z, -Z
    /// (the order of [`ChunkCoord::neighbors`]).
    pub fn new(center: Arc<VoxelChunk>, neighbors: [Option<Arc<VoxelChunk>>; 4]) -> Self {
        ChunkNeighborhood { center, neighbors }
    }

    /// A chunk with no loaded neighbours.
    pub fn isolated(center: Arc<VoxelChunk>) -> Self {
        ChunkNeighborhood::new(center, [None, None, None, None])
    }

    /// The chunk being meshed.
    pub fn coord(&self) -> ChunkCoord {
        self.center.coord()
    }

    /// Extents of the chunk being meshed.
    pub fn dims(&self) -> &ChunkDimensions {
        self.center.dims()
    }

    /// Reads a block relative to the center chunk's origin.
    ///
    /// Coordinates up to one chunk past an X or Z edge read from that neighbour.
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId {
        let dims = self.center.dims();
        let (sx, sz, height) = (dims.size_x as i32, dims.size_z as i32, dims.height as i32);
        if !(0..height).contains(&y) {
            return AIR;
        }

        let inside_x = (0..sx).contains(&x);
        let inside_z = (0..sz).contains(&z);
        let (chunk, lx, lz) = match (inside_x, inside_z) {
            (true, true) => (Some(&self.center), x, z),
            (false, true) if (sx..2 * sx).contains(&x) => (self.neighbors[POS_X].as_ref(), x - sx, z),
            (false, true) if (-sx..0).contains(&x) => (self.neighbors[NEG_X].as_ref(), x + sx, z),
            (true, false) if (sz..2 * sz).contains(&z) => (self.neighbors[POS_Z].as_ref(), x, z - sz),
            (true, false) if (-sz..0).contains(&z) => (self.neighbors[NEG_Z].as_ref(), x, z + sz),
            _ => (None, 0, 0),
        };

        chunk
            .and_then(|chunk| chunk.get(lx as usize, y as usize, lz as usize).ok())
            .unwrap_or(AIR)
    }

    /// Copies the chunk plus a one-block ring of neighbour data into a flat volume.
    pub(crate) fn pad(&self, registry: &BlockRegistry) -> PaddedVolume {
        PaddedVolume::build(self, registry)
    }
}

/// The center chunk padded by one block on every X and Z side.
///
/// Holds block ids and an occluder bit per cell so the sweeps never branch on
/// which chunk a cell belongs to.
pub(crate) struct PaddedVolume {
    size: [i32; 3],
    padded_x: usize,
    blocks: Vec<BlockId>,
    occluders: BitVec,
}

impl PaddedVolume {
    fn build(neighborhood: &ChunkNeighborhood, registry: &BlockRegistry) -> Self {
        let dims = *neighborhood.dims();
        let padded_x = dims.size_x + 2;
        let padded_z = dims.size_z + 2;
        let volume = padded_x * padded_z * dims.height;

        let mut blocks = Vec::with_capacity(volume);
        let mut occluders = BitVec::with_capacity(volume);
        for z in -1..=dims.size_z as i32 {
            for y in 0..dims.height as i32 {
                for x in -1..=dims.size_x as i32 {
                    let block = neighborhood.block_at(x, y, z);
                    blocks.push(block);
                    occluders.push(registry.occludes(block));
                }
            }
        }

        PaddedVolume {
            size: [dims.size_x as i32, dims.height as i32, dims.size_z as i32],
            padded_x,
            blocks,
            occluders,
        }
    }

    /// Extents of the unpadded chunk in sweep order `[x, y, z]`.
    pub(crate) fn size(&self) -> [i32; 3] {
        self.size
    }

    fn index(&self, [x, y, z]: [i32; 3]) -> Option<usize> {
        let inside = (-1..=self.size[0]).contains(&x)
            && (0..self.size[1]).contains(&y)
            && (-1..=self.size[2]).contains(&z);
        inside.then(|| {
            (x + 1) as usize
                + self.padded_x * (y as usize + self.size[1] as usize * (z + 1) as usize)
        })
    }

    /// Block at a local position; anything outside the padded volume is air.
    pub(crate) fn block(&self, position: [i32; 3]) -> BlockId {
        self.index(position).map_or(AIR, |index| self.blocks[index])
    }

    /// Whether the block at a local position darkens corners.
    pub(crate) fn occludes(&self, position: [i32; 3]) -> bool {
        self.index(position).is_some_and(|index| self.occluders[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;

    fn dims() -> ChunkDimensions {
        ChunkDimensions {
            size_x: 4,
            size_z: 4,
            height: 4,
        }
    }

    fn filled(coord: ChunkCoord, block: BlockType) -> Arc<VoxelChunk> {
        let dims = dims();
        let chunk =
            VoxelChunk::from_blocks(coord, dims, vec![block.id(); dims.volume()]).unwrap();
        Arc::new(chunk)
    }

    #[test]
    fn reads_cross_into_lateral_neighbours_only() {
        let center = ChunkCoord::new(0, 0);
        let neighborhood = ChunkNeighborhood::new(
            filled(center, BlockType::STONE),
            [
                Some(filled(center.offset(1, 0), BlockType::DIRT)),
                None,
                Some(filled(center.offset(0, 1), BlockType::SAND)),
                Some(filled(center.offset(0, -1), BlockType::GRASS)),
            ],
        );

        assert_eq!(neighborhood.block_at(2, 1, 2), BlockType::STONE.id());
        assert_eq!(neighborhood.block_at(4, 1, 2), BlockType::DIRT.id());
        assert_eq!(neighborhood.block_at(-1, 1, 2), AIR);
        assert_eq!(neighborhood.block_at(1, 1, 4), BlockType::SAND.id());
        assert_eq!(neighborhood.block_at(1, 1, -1), BlockType::GRASS.id());
        assert_eq!(neighborhood.block_at(4, 1, 4), AIR, "diagonals read as air");
        assert_eq!(neighborhood.block_at(1, -1, 1), AIR);
        assert_eq!(neighborhood.block_at(1, 4, 1), AIR);
    }

    #[test]
    fn padded_volume_matches_block_at() {
        let center = ChunkCoord::new(3, 3);
        let neighborhood = ChunkNeighborhood::new(
            filled(center, BlockType::STONE),
            [None, Some(filled(center.offset(-1, 0), BlockType::LEAVES)), None, None],
        );
        let registry = BlockRegistry::standard();
        let volume = neighborhood.pad(&registry);

        assert_eq!(volume.size(), [4, 4, 4]);
        assert_eq!(volume.block([0, 0, 0]), BlockType::STONE.id());
        assert_eq!(volume.block([-1, 2, 1]), BlockType::LEAVES.id());
        assert!(volume.occludes([3, 3, 3]));
        assert!(!volume.occludes([-1, 2, 1]), "leaves do not occlude");
        assert!(!volume.occludes([4, 0, 0]));
        assert!(!volume.occludes([0, 4, 0]));
        assert_eq!(volume.block([5, 0, 0]), AIR);
    }
}
