//! # Block Module
//!
//! This module provides the core block-related functionality for the world engine.
//! It includes block type definitions, block face handling, the static per-type
//! definition table and the `Block` value stored in every chunk cell.

use block_side::AtlasFace;
use block_type::{BlockType, BLOCK_TYPE_COUNT};

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in compact form.
pub type BlockTypeSize = u8;

/// Number of tiles along each edge of the square texture atlas.
pub const ATLAS_TILES_PER_ROW: u16 = 16;

/// Width (and height) of one atlas tile in normalized UV space.
pub const ATLAS_TILE_SIZE: f32 = 1.0 / ATLAS_TILES_PER_ROW as f32;

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];
const GRASS_TINT: [f32; 3] = [0.49, 0.74, 0.29];
const JUNGLE_TINT: [f32; 3] = [0.35, 0.80, 0.22];
const TUNDRA_TINT: [f32; 3] = [0.60, 0.72, 0.58];
const OAK_TINT: [f32; 3] = [0.38, 0.65, 0.22];
const BIRCH_TINT: [f32; 3] = [0.50, 0.66, 0.33];
const SPRUCE_TINT: [f32; 3] = [0.30, 0.48, 0.32];
const ACACIA_TINT: [f32; 3] = [0.60, 0.62, 0.20];

/// Per-face values for the three atlas face groups.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FaceSet<T> {
    /// Value for the upward-facing surface
    pub top: T,
    /// Value for the four vertical surfaces
    pub side: T,
    /// Value for the downward-facing surface
    pub bottom: T,
}

impl<T: Copy> FaceSet<T> {
    const fn uniform(value: T) -> Self {
        FaceSet {
            top: value,
            side: value,
            bottom: value,
        }
    }

    /// Picks the value for one atlas face group.
    pub fn get(&self, face: AtlasFace) -> T {
        match face {
            AtlasFace::Top => self.top,
            AtlasFace::Side => self.side,
            AtlasFace::Bottom => self.bottom,
        }
    }
}

/// Static description of a block type: atlas tiles, tints and render flags.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlockDefinition {
    /// The type this entry describes
    pub block_type: BlockType,
    /// Atlas tile index per face group (row-major in a 16x16 atlas)
    pub tiles: FaceSet<u16>,
    /// Multiplicative RGB tint per face group
    pub tints: FaceSet<[f32; 3]>,
    /// Rendered with alpha testing (leaves)
    pub cutout: bool,
}

impl BlockDefinition {
    const fn uniform(block_type: BlockType, tile: u16) -> Self {
        BlockDefinition {
            block_type,
            tiles: FaceSet::uniform(tile),
            tints: FaceSet::uniform(WHITE),
            cutout: false,
        }
    }

    const fn column(block_type: BlockType, top: u16, side: u16, bottom: u16) -> Self {
        BlockDefinition {
            block_type,
            tiles: FaceSet { top, side, bottom },
            tints: FaceSet::uniform(WHITE),
            cutout: false,
        }
    }

    const fn topsoil(block_type: BlockType, top: u16, side: u16, bottom: u16, tint: [f32; 3]) -> Self {
        BlockDefinition {
            block_type,
            tiles: FaceSet { top, side, bottom },
            tints: FaceSet {
                top: tint,
                side: WHITE,
                bottom: WHITE,
            },
            cutout: false,
        }
    }

    const fn leaves(block_type: BlockType, tile: u16, tint: [f32; 3]) -> Self {
        BlockDefinition {
            block_type,
            tiles: FaceSet::uniform(tile),
            tints: FaceSet::uniform(tint),
            cutout: true,
        }
    }

    /// UV offset of the atlas tile used for `face`.
    pub fn uv_offset(&self, face: AtlasFace) -> [f32; 2] {
        let tile = self.tiles.get(face);
        [
            (tile % ATLAS_TILES_PER_ROW) as f32 * ATLAS_TILE_SIZE,
            (tile / ATLAS_TILES_PER_ROW) as f32 * ATLAS_TILE_SIZE,
        ]
    }
}

/// Per-type definition table, indexed by `BlockType as usize`.
pub static BLOCK_DEFINITIONS: [BlockDefinition; BLOCK_TYPE_COUNT] = [
    BlockDefinition::uniform(BlockType::Empty, 0),
    BlockDefinition::topsoil(BlockType::Grass, 1, 2, 3, GRASS_TINT),
    BlockDefinition::uniform(BlockType::Dirt, 3),
    BlockDefinition::uniform(BlockType::Stone, 4),
    BlockDefinition::uniform(BlockType::Sand, 5),
    BlockDefinition::column(BlockType::Sandstone, 6, 7, 8),
    BlockDefinition::uniform(BlockType::Gravel, 9),
    BlockDefinition::uniform(BlockType::Clay, 10),
    BlockDefinition::column(BlockType::Snow, 11, 12, 3),
    BlockDefinition::uniform(BlockType::Ice, 13),
    BlockDefinition::uniform(BlockType::Mud, 14),
    BlockDefinition::column(BlockType::Podzol, 15, 16, 3),
    BlockDefinition::topsoil(BlockType::JungleGrass, 1, 2, 3, JUNGLE_TINT),
    BlockDefinition::topsoil(BlockType::TundraGrass, 1, 2, 3, TUNDRA_TINT),
    BlockDefinition::uniform(BlockType::RedSand, 17),
    BlockDefinition::uniform(BlockType::Bedrock, 18),
    BlockDefinition::uniform(BlockType::CoalOre, 19),
    BlockDefinition::uniform(BlockType::IronOre, 20),
    BlockDefinition::uniform(BlockType::CopperOre, 21),
    BlockDefinition::uniform(BlockType::GoldOre, 22),
    BlockDefinition::uniform(BlockType::DiamondOre, 23),
    BlockDefinition::uniform(BlockType::RedstoneOre, 24),
    BlockDefinition::uniform(BlockType::LapisOre, 25),
    BlockDefinition::uniform(BlockType::EmeraldOre, 26),
    BlockDefinition::column(BlockType::OakLog, 27, 28, 27),
    BlockDefinition::column(BlockType::BirchLog, 29, 30, 29),
    BlockDefinition::column(BlockType::SpruceLog, 31, 32, 31),
    BlockDefinition::column(BlockType::JungleLog, 33, 34, 33),
    BlockDefinition::column(BlockType::AcaciaLog, 35, 36, 35),
    BlockDefinition::column(BlockType::Cactus, 37, 38, 39),
    BlockDefinition::leaves(BlockType::OakLeaves, 40, OAK_TINT),
    BlockDefinition::leaves(BlockType::BirchLeaves, 40, BIRCH_TINT),
    BlockDefinition::leaves(BlockType::SpruceLeaves, 41, SPRUCE_TINT),
    BlockDefinition::leaves(BlockType::JungleLeaves, 42, JUNGLE_TINT),
    BlockDefinition::leaves(BlockType::AcaciaLeaves, 40, ACACIA_TINT),
    BlockDefinition::uniform(BlockType::OakPlanks, 43),
    BlockDefinition::uniform(BlockType::BirchPlanks, 44),
    BlockDefinition::uniform(BlockType::SprucePlanks, 45),
    BlockDefinition::uniform(BlockType::JunglePlanks, 46),
    BlockDefinition::uniform(BlockType::Cobblestone, 47),
    BlockDefinition::uniform(BlockType::MossyCobblestone, 48),
    BlockDefinition::uniform(BlockType::StoneBricks, 49),
    BlockDefinition::uniform(BlockType::Bricks, 50),
    BlockDefinition::uniform(BlockType::Granite, 51),
    BlockDefinition::uniform(BlockType::Diorite, 52),
    BlockDefinition::uniform(BlockType::Andesite, 53),
    BlockDefinition::uniform(BlockType::Obsidian, 54),
    BlockDefinition::column(BlockType::Basalt, 55, 56, 55),
    BlockDefinition::column(BlockType::Bookshelf, 43, 57, 43),
    BlockDefinition::column(BlockType::HayBale, 58, 59, 58),
    BlockDefinition::column(BlockType::Pumpkin, 60, 61, 60),
    BlockDefinition::column(BlockType::Melon, 62, 63, 62),
    BlockDefinition::uniform(BlockType::WhiteWool, 64),
    BlockDefinition::uniform(BlockType::RedWool, 65),
    BlockDefinition::uniform(BlockType::OrangeWool, 66),
    BlockDefinition::uniform(BlockType::YellowWool, 67),
    BlockDefinition::uniform(BlockType::GreenWool, 68),
    BlockDefinition::uniform(BlockType::BlueWool, 69),
    BlockDefinition::uniform(BlockType::PurpleWool, 70),
    BlockDefinition::uniform(BlockType::BlackWool, 71),
];

/// Represents a single voxel in a chunk.
///
/// Blocks are plain values. The chunk that owns a block rewrites its type and
/// instance id in place; everything else about a type comes from its
/// `BlockDefinition`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// The type of this block
    pub block_type: BlockType,
    /// Set when the resource pass claimed this voxel
    pub is_resource: bool,
    /// Index into the owning chunk's instance buffers, `None` when not rendered
    pub instance_id: Option<u32>,
}

impl Block {
    /// Creates a new block of the specified type with no render instance.
    pub fn new(block_type: BlockType) -> Self {
        Block {
            block_type,
            is_resource: false,
            instance_id: None,
        }
    }

    /// Creates an `Empty` block.
    pub fn empty() -> Self {
        Block::new(BlockType::Empty)
    }

    /// Creates a block claimed by the resource pass.
    pub fn resource(block_type: BlockType) -> Self {
        Block {
            is_resource: true,
            ..Block::new(block_type)
        }
    }

    /// Whether this cell holds no block.
    pub fn is_empty(&self) -> bool {
        self.block_type.is_empty()
    }

    /// The static definition for this block's type.
    pub fn definition(&self) -> &'static BlockDefinition {
        &BLOCK_DEFINITIONS[self.block_type as usize]
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::empty()
    }
}
