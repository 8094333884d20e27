//! Biome classification and the per-biome surface and tree profiles.

use crate::engine_state::voxels::block::block_type::BlockType;

/// Climate band of a column, after the beach and snow overrides.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
    /// Cold grassland with spruce
    Tundra,
    /// Temperate grassland with oak
    Meadow,
    /// Dry sand with cactus
    Desert,
    /// Dense tall trees
    Jungle,
    /// Sand band around the sea plane
    Beach,
    /// Snow above the mountain cap
    SnowCap,
}

/// Surface blocks and tree shape parameters of a biome.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BiomeProfile {
    /// Block placed at the surface voxel
    pub top: BlockType,
    /// Block placed in the soil layer under the surface
    pub filler: BlockType,
    /// Trunk block
    pub trunk: BlockType,
    /// Canopy block; `None` for biomes whose trees have no canopy
    pub leaves: Option<BlockType>,
    /// Inclusive trunk height range
    pub trunk_height: (u32, u32),
    /// Inclusive canopy radius range
    pub canopy_radius: (u32, u32),
    /// Tree-noise band `(low, high)` that places a tree; `None` for treeless biomes
    pub tree_band: Option<(f64, f64)>,
}

const TUNDRA: BiomeProfile = BiomeProfile {
    top: BlockType::TundraGrass,
    filler: BlockType::Dirt,
    trunk: BlockType::SpruceLog,
    leaves: Some(BlockType::SpruceLeaves),
    trunk_height: (5, 8),
    canopy_radius: (2, 2),
    tree_band: Some((0.82, 1.0)),
};

const MEADOW: BiomeProfile = BiomeProfile {
    top: BlockType::Grass,
    filler: BlockType::Dirt,
    trunk: BlockType::OakLog,
    leaves: Some(BlockType::OakLeaves),
    trunk_height: (4, 6),
    canopy_radius: (2, 3),
    tree_band: Some((0.78, 1.0)),
};

const DESERT: BiomeProfile = BiomeProfile {
    top: BlockType::Sand,
    filler: BlockType::Sandstone,
    trunk: BlockType::Cactus,
    leaves: None,
    trunk_height: (1, 3),
    canopy_radius: (0, 0),
    tree_band: Some((0.88, 1.0)),
};

const JUNGLE: BiomeProfile = BiomeProfile {
    top: BlockType::JungleGrass,
    filler: BlockType::Dirt,
    trunk: BlockType::JungleLog,
    leaves: Some(BlockType::JungleLeaves),
    trunk_height: (6, 10),
    canopy_radius: (3, 4),
    tree_band: Some((0.55, 1.0)),
};

const BEACH: BiomeProfile = BiomeProfile {
    top: BlockType::Sand,
    filler: BlockType::Sand,
    trunk: BlockType::OakLog,
    leaves: None,
    trunk_height: (0, 0),
    canopy_radius: (0, 0),
    tree_band: None,
};

const SNOW_CAP: BiomeProfile = BiomeProfile {
    top: BlockType::Snow,
    filler: BlockType::Dirt,
    trunk: BlockType::SpruceLog,
    leaves: None,
    trunk_height: (0, 0),
    canopy_radius: (0, 0),
    tree_band: None,
};

impl Biome {
    /// Maps the biome channel value (in `[-1, 1]`) to a climate band.
    pub fn from_channel(value: f64) -> Biome {
        match value {
            v if v < -0.25 => Biome::Tundra,
            v if v < 0.05 => Biome::Meadow,
            v if v < 0.3 => Biome::Desert,
            _ => Biome::Jungle,
        }
    }

    /// Applies the height overrides: snow at or above `mountain_cap`, beach
    /// within one block of `sea_level`.
    pub fn with_overrides(self, height: i32, sea_level: i32, mountain_cap: i32) -> Biome {
        if height >= mountain_cap {
            Biome::SnowCap
        } else if (height - sea_level).abs() <= 1 {
            Biome::Beach
        } else {
            self
        }
    }

    /// The surface and tree profile of this biome.
    pub fn profile(self) -> &'static BiomeProfile {
        match self {
            Biome::Tundra => &TUNDRA,
            Biome::Meadow => &MEADOW,
            Biome::Desert => &DESERT,
            Biome::Jungle => &JUNGLE,
            Biome::Beach => &BEACH,
            Biome::SnowCap => &SNOW_CAP,
        }
    }
}
