//! # Block Type Module
//!
//! This module defines the built-in block types of the voxel world.
//! It provides conversion between the compact on-chunk id and the rich enum.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::BlockId;

/// Enumerates the block types shipped with the standard registry.
///
/// The discriminant of each variant is the id stored in chunk buffers. The
/// `FromPrimitive` derive allows conversion back from that id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Absence of a block. Never registered.
    AIR = 0,

    /// Grass-topped soil. Green on top, grass-on-dirt on the sides, dirt below.
    GRASS = 1,

    /// Plain dirt, found directly under grass.
    DIRT = 2,

    /// Bedrock-like filler below the topsoil.
    STONE = 3,

    /// Beach and sea-floor material.
    SAND = 4,

    /// Non-solid, transparent liquid filling everything at or below water level.
    WATER = 5,

    /// Tree trunk. Bark on the sides, rings on the ends.
    LOG = 6,

    /// Tree canopy. Solid but see-through.
    LEAVES = 7,
}

impl BlockType {
    /// Converts a stored id into a `BlockType`.
    ///
    /// # Returns
    /// `None` when the id does not correspond to a built-in type.
    pub fn from_id(id: BlockId) -> Option<Self> {
        FromPrimitive::from_u8(id)
    }

    /// The id written into chunk buffers for this type.
    pub fn id(self) -> BlockId {
        self as BlockId
    }

    /// Returns all built-in types except `AIR`, in id order.
    pub fn all_blocks() -> [BlockType; 7] {
        [
            BlockType::GRASS,
            BlockType::DIRT,
            BlockType::STONE,
            BlockType::SAND,
            BlockType::WATER,
            BlockType::LOG,
            BlockType::LEAVES,
        ]
    }
}
