//! Resource (ore and pocket) table used by the resource pass.

use crate::engine_state::voxels::block::block_type::BlockType;

/// One resource layer: a 3D noise field sampled at an anisotropic scale and
/// thresholded at `scarcity`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResourceDefinition {
    /// Block written where the layer fires
    pub block_type: BlockType,
    /// Wavelength along x, y and z, in blocks
    pub scale: [f64; 3],
    /// Noise threshold; higher is rarer
    pub scarcity: f64,
}

/// Resource layers in claim order. Earlier layers win a voxel.
pub static RESOURCES: [ResourceDefinition; 7] = [
    ResourceDefinition {
        block_type: BlockType::CoalOre,
        scale: [20.0, 20.0, 20.0],
        scarcity: 0.78,
    },
    ResourceDefinition {
        block_type: BlockType::IronOre,
        scale: [40.0, 30.0, 40.0],
        scarcity: 0.82,
    },
    ResourceDefinition {
        block_type: BlockType::CopperOre,
        scale: [30.0, 18.0, 30.0],
        scarcity: 0.84,
    },
    ResourceDefinition {
        block_type: BlockType::GoldOre,
        scale: [16.0, 16.0, 16.0],
        scarcity: 0.88,
    },
    ResourceDefinition {
        block_type: BlockType::DiamondOre,
        scale: [10.0, 10.0, 10.0],
        scarcity: 0.92,
    },
    ResourceDefinition {
        block_type: BlockType::Gravel,
        scale: [26.0, 10.0, 26.0],
        scarcity: 0.8,
    },
    ResourceDefinition {
        block_type: BlockType::Clay,
        scale: [32.0, 6.0, 32.0],
        scarcity: 0.86,
    },
];
