//! # Block Module
//!
//! This module provides the block registry: the read-only table mapping a block id
//! to its material properties (solidity, transparency and texture-atlas tiles).
//!
//! The registry is built once by the host and shared by reference (`Arc`) with the
//! world and the meshing jobs. There is no process-wide block table.

use block_side::BlockSide;
use block_type::BlockType;
use thiserror::Error;

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in chunk buffers.
/// `0` is reserved for air.
pub type BlockId = u8;

/// The id stored for empty space.
pub const AIR: BlockId = 0;

/// Number of tiles along one edge of the texture atlas.
pub const ATLAS_TILES_PER_ROW: u16 = 16;

/// Errors raised while building a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    /// Id 0 is air and cannot carry properties.
    #[error("block id 0 is reserved for air")]
    ReservedId,
    /// Two registrations used the same id.
    #[error("duplicate block id: {0}")]
    DuplicateId(BlockId),
}

/// Position of a tile inside the texture atlas, in normalized UV space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TextureOffset {
    /// Left edge of the tile
    pub u: f32,
    /// Bottom edge of the tile
    pub v: f32,
}

impl TextureOffset {
    /// Computes the UV offset of an atlas tile.
    ///
    /// Tiles are numbered row by row from the top-left corner of the atlas, while
    /// `v` grows upwards, so row 0 sits at the top of UV space.
    pub fn from_tile(tile: u16) -> Self {
        let scale = 1.0 / ATLAS_TILES_PER_ROW as f32;
        let column = (tile % ATLAS_TILES_PER_ROW) as f32;
        let row = (tile / ATLAS_TILES_PER_ROW) as f32;
        TextureOffset {
            u: column * scale,
            v: 1.0 - row * scale - scale,
        }
    }
}

/// Atlas tiles used by each face of a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FaceTextures {
    /// Tile for the +Y face
    pub top: u16,
    /// Tile for the -Y face
    pub bottom: u16,
    /// Tile for the four lateral faces
    pub side: u16,
}

impl FaceTextures {
    /// Uses the same tile on every face.
    pub fn uniform(tile: u16) -> Self {
        FaceTextures {
            top: tile,
            bottom: tile,
            side: tile,
        }
    }

    /// Returns the tile for a given face.
    pub fn tile_for(&self, side: BlockSide) -> u16 {
        match side {
            BlockSide::TOP => self.top,
            BlockSide::BOTTOM => self.bottom,
            _ => self.side,
        }
    }
}

/// Immutable material record for one block id.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockProperties {
    /// Id stored in chunk buffers. Always at least 1.
    pub id: BlockId,
    /// Human readable name, used in logs.
    pub name: &'static str,
    /// Whether the block occupies space.
    pub solid: bool,
    /// Whether the block lets neighbouring faces show through.
    pub transparent: bool,
    /// Atlas tiles per face.
    pub textures: FaceTextures,
}

/// Dense, id-indexed table of block properties.
///
/// # Examples
///
/// ```
/// use voxel_world::engine_state::voxels::block::{BlockRegistry, block_type::BlockType};
///
/// let registry = BlockRegistry::standard();
/// assert!(registry.is_transparent(BlockType::WATER.id()));
/// assert!(registry.occludes(BlockType::STONE.id()));
/// ```
#[derive(Clone, Debug, Default)]
pub struct BlockRegistry {
    blocks: Vec<Option<BlockProperties>>,
}

impl BlockRegistry {
    /// Creates a registry containing only air.
    pub fn new() -> Self {
        BlockRegistry { blocks: vec![None] }
    }

    /// Builds the registry holding every built-in [`BlockType`].
    pub fn standard() -> Self {
        let mut registry = BlockRegistry::new();
        let definitions = [
            (BlockType::GRASS, "grass", true, false, FaceTextures { top: 0, bottom: 2, side: 3 }),
            (BlockType::DIRT, "dirt", true, false, FaceTextures::uniform(2)),
            (BlockType::STONE, "stone", true, false, FaceTextures::uniform(1)),
            (BlockType::SAND, "sand", true, false, FaceTextures::uniform(18)),
            (BlockType::WATER, "water", false, true, FaceTextures::uniform(205)),
            (BlockType::LOG, "log", true, false, FaceTextures { top: 21, bottom: 21, side: 20 }),
            (BlockType::LEAVES, "leaves", true, true, FaceTextures::uniform(52)),
        ];

        for (block_type, name, solid, transparent, textures) in definitions {
            registry.blocks.push(Some(BlockProperties {
                id: block_type.id(),
                name,
                solid,
                transparent,
                textures,
            }));
        }

        registry
    }

    /// Adds a block definition.
    ///
    /// The table grows to fit `properties.id`; gaps stay unregistered.
    pub fn register(&mut self, properties: BlockProperties) -> Result<(), BlockError> {
        if properties.id == AIR {
            return Err(BlockError::ReservedId);
        }
        let index = properties.id as usize;
        if self.blocks.len() <= index {
            self.blocks.resize(index + 1, None);
        }
        if self.blocks[index].is_some() {
            return Err(BlockError::DuplicateId(properties.id));
        }
        self.blocks[index] = Some(properties);
        Ok(())
    }

    /// Looks up a block's properties. Air and unknown ids return `None`.
    pub fn get(&self, id: BlockId) -> Option<&BlockProperties> {
        self.blocks.get(id as usize).and_then(Option::as_ref)
    }

    /// Whether the id can be stored in a chunk (air or a registered block).
    pub fn is_known(&self, id: BlockId) -> bool {
        id == AIR || self.get(id).is_some()
    }

    /// Whether faces behind this block remain visible. Unknown ids count as opaque.
    pub fn is_transparent(&self, id: BlockId) -> bool {
        self.get(id).is_some_and(|block| block.transparent)
    }

    /// Whether the block darkens adjacent corners for ambient occlusion.
    pub fn occludes(&self, id: BlockId) -> bool {
        self.get(id)
            .is_some_and(|block| block.solid && !block.transparent)
    }

    /// Atlas offset for one face of a block. Unknown ids map to tile 0.
    pub fn face_texture(&self, id: BlockId, side: BlockSide) -> TextureOffset {
        let tile = self
            .get(id)
            .map(|block| block.textures.tile_for(side))
            .unwrap_or(0);
        TextureOffset::from_tile(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_matches_block_types() {
        let registry = BlockRegistry::standard();
        for block in BlockType::all_blocks() {
            let properties = registry.get(block.id()).unwrap();
            assert_eq!(properties.id, block.id());
        }
        assert!(registry.get(AIR).is_none());
        assert!(registry.is_known(AIR));
        assert!(!registry.is_known(42));
    }

    #[test]
    fn leaves_are_solid_but_do_not_occlude() {
        let registry = BlockRegistry::standard();
        let leaves = BlockType::LEAVES.id();
        assert!(registry.get(leaves).unwrap().solid);
        assert!(registry.is_transparent(leaves));
        assert!(!registry.occludes(leaves));
        assert!(!registry.occludes(BlockType::WATER.id()));
    }

    #[test]
    fn grass_uses_distinct_top_and_side_tiles() {
        let registry = BlockRegistry::standard();
        let grass = BlockType::GRASS.id();
        let top = registry.face_texture(grass, BlockSide::TOP);
        let side = registry.face_texture(grass, BlockSide::LEFT);
        assert_eq!(top, TextureOffset::from_tile(0));
        assert_eq!(side, TextureOffset::from_tile(3));
        assert_eq!(registry.face_texture(grass, BlockSide::FRONT), side);
    }

    #[test]
    fn tile_offsets_follow_atlas_rows() {
        let first = TextureOffset::from_tile(0);
        assert_eq!(first, TextureOffset { u: 0.0, v: 0.9375 });
        let second_row = TextureOffset::from_tile(17);
        assert_eq!(second_row, TextureOffset { u: 0.0625, v: 0.875 });
    }

    #[test]
    fn register_rejects_air_and_duplicates() {
        let mut registry = BlockRegistry::standard();
        let mut glass = BlockProperties {
            id: AIR,
            name: "glass",
            solid: true,
            transparent: true,
            textures: FaceTextures::uniform(49),
        };
        assert_eq!(registry.register(glass.clone()), Err(BlockError::ReservedId));

        glass.id = BlockType::STONE.id();
        assert_eq!(
            registry.register(glass.clone()),
            Err(BlockError::DuplicateId(BlockType::STONE.id()))
        );

        glass.id = 20;
        assert!(registry.register(glass).is_ok());
        assert!(registry.is_transparent(20));
        assert!(registry.get(15).is_none());
    }
}
