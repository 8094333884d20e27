//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides block type identification, classification and conversion from
//! the compact integer form used by hosts and palettes.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use super::BlockTypeSize;

/// Number of `BlockType` variants, `Empty` included.
pub const BLOCK_TYPE_COUNT: usize = 60;

/// Enumerates all possible block types in the voxel world.
///
/// The discriminant doubles as the index into the static definition table
/// (`BLOCK_DEFINITIONS`). The serialized form is the camel-case name, which is
/// what the persisted edit log stores.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
    /// No block. Never rendered, never collides.
    Empty = 0,

    // Terrain surface and soil
    Grass,
    Dirt,
    Stone,
    Sand,
    Sandstone,
    Gravel,
    Clay,
    Snow,
    Ice,
    Mud,
    Podzol,
    JungleGrass,
    TundraGrass,
    RedSand,
    Bedrock,

    // Resources
    CoalOre,
    IronOre,
    CopperOre,
    GoldOre,
    DiamondOre,
    RedstoneOre,
    LapisOre,
    EmeraldOre,

    // Vegetation
    OakLog,
    BirchLog,
    SpruceLog,
    JungleLog,
    AcaciaLog,
    Cactus,
    OakLeaves,
    BirchLeaves,
    SpruceLeaves,
    JungleLeaves,
    AcaciaLeaves,

    // Building blocks
    OakPlanks,
    BirchPlanks,
    SprucePlanks,
    JunglePlanks,
    Cobblestone,
    MossyCobblestone,
    StoneBricks,
    Bricks,
    Granite,
    Diorite,
    Andesite,
    Obsidian,
    Basalt,
    Bookshelf,
    HayBale,
    Pumpkin,
    Melon,
    WhiteWool,
    RedWool,
    OrangeWool,
    YellowWool,
    GreenWool,
    BlueWool,
    PurpleWool,
    BlackWool,
}

impl BlockType {
    /// Converts a `BlockTypeSize` to a `BlockType`.
    ///
    /// # Returns
    /// `None` if the value does not name a block type.
    pub fn from_id(id: BlockTypeSize) -> Option<Self> {
        FromPrimitive::from_u8(id)
    }

    /// The compact integer form of this type.
    pub fn id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Whether this is the `Empty` type.
    pub fn is_empty(self) -> bool {
        self == BlockType::Empty
    }

    /// Leaves are semi-transparent: they never fully occlude a neighbour.
    pub fn is_leaves(self) -> bool {
        matches!(
            self,
            BlockType::OakLeaves
                | BlockType::BirchLeaves
                | BlockType::SpruceLeaves
                | BlockType::JungleLeaves
                | BlockType::AcaciaLeaves
        )
    }

    /// Tree trunks, cactus included.
    pub fn is_wood(self) -> bool {
        matches!(
            self,
            BlockType::OakLog
                | BlockType::BirchLog
                | BlockType::SpruceLog
                | BlockType::JungleLog
                | BlockType::AcaciaLog
                | BlockType::Cactus
        )
    }

    /// Whether a neighbouring face stays exposed next to this type.
    pub fn is_see_through(self) -> bool {
        self.is_empty() || self.is_leaves()
    }
}
