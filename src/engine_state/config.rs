//! # Configuration
//!
//! Parameter snapshots supplied by the host's UI layer.
//!
//! Every struct here is plain data: `serde` for hosts that keep settings as
//! JSON, `Default` for the shipped values, and a `validate` that rejects
//! parameter sets generation cannot work with. A snapshot is immutable for the
//! duration of a generation pass; replacing the terrain snapshot invalidates
//! every chunk.

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Chunk dimensions shared by every chunk in a world.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSize {
    /// Chunk extent along X and Z, in blocks
    pub width: usize,
    /// World extent along Y, in blocks
    pub height: usize,
}

impl Default for WorldSize {
    fn default() -> Self {
        WorldSize {
            width: 32,
            height: 64,
        }
    }
}

impl WorldSize {
    /// Number of voxels in one chunk.
    pub fn volume(&self) -> usize {
        self.width * self.width * self.height
    }

    /// Rejects degenerate sizes.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.width > 0, "chunk width must be positive");
        ensure!(self.height > 0, "world height must be positive");
        ensure!(
            self.width <= i32::MAX as usize && self.height <= i32::MAX as usize,
            "world size {}x{} does not fit block coordinates",
            self.width,
            self.height
        );
        Ok(())
    }
}

/// Terrain generation parameters.
///
/// Scales are wavelengths in blocks. `magnitude` scales the continental relief
/// against the world height; `offset` raises the whole surface by `offset * 16`
/// blocks.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParameters {
    /// Seed of the generator every noise layer is drawn from
    pub seed: u32,
    /// Wavelength of the continentalness channel
    pub scale: f64,
    /// Relief of the continental curve, as a fraction of world height
    pub magnitude: f64,
    /// Uniform surface lift, in units of 16 blocks
    pub offset: f64,
    /// Octaves of the continentalness channel
    pub continental_octaves: u32,
    /// Wavelength of the peaks-and-valleys channel
    pub pv_scale: f64,
    /// Height of the tallest ridge, in blocks
    pub pv_magnitude: f64,
    /// Octaves of the peaks-and-valleys channel
    pub pv_octaves: u32,
    /// Wavelength of the erosion mask
    pub erosion_scale: f64,
    /// How much a fully eroded column flattens its ridges (0..=1)
    pub erosion_strength: f64,
    /// Octaves of the erosion mask
    pub erosion_octaves: u32,
    /// Surface height of the sea plane
    pub sea_level: i32,
    /// Height above which columns carry snow
    pub mountain_cap: i32,
    /// Maximum domain-warp displacement, in blocks
    pub warp_strength: f64,
    /// Wavelength of the biome channel
    pub biome_scale: f64,
    /// Wavelength of the tree placement channel
    pub tree_scale: f64,
}

impl Default for TerrainParameters {
    fn default() -> Self {
        TerrainParameters {
            seed: 123_456_789,
            scale: 30.0,
            magnitude: 0.5,
            offset: 0.2,
            continental_octaves: 4,
            pv_scale: 60.0,
            pv_magnitude: 14.0,
            pv_octaves: 4,
            erosion_scale: 90.0,
            erosion_strength: 0.6,
            erosion_octaves: 3,
            sea_level: 20,
            mountain_cap: 48,
            warp_strength: 12.0,
            biome_scale: 180.0,
            tree_scale: 1.0,
        }
    }
}

impl TerrainParameters {
    /// Rejects parameter sets the sampler cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("scale", self.scale),
            ("pv_scale", self.pv_scale),
            ("erosion_scale", self.erosion_scale),
            ("biome_scale", self.biome_scale),
            ("tree_scale", self.tree_scale),
        ] {
            ensure!(
                value.is_finite() && value > 0.0,
                "{name} must be a positive finite number, got {value}"
            );
        }
        for (name, value) in [
            ("magnitude", self.magnitude),
            ("offset", self.offset),
            ("pv_magnitude", self.pv_magnitude),
            ("warp_strength", self.warp_strength),
        ] {
            ensure!(value.is_finite(), "{name} must be finite, got {value}");
        }
        ensure!(
            (0.0..=1.0).contains(&self.erosion_strength),
            "erosion_strength must be within 0..=1, got {}",
            self.erosion_strength
        );
        ensure!(
            self.mountain_cap > self.sea_level,
            "mountain_cap ({}) must be above sea_level ({})",
            self.mountain_cap,
            self.sea_level
        );
        Ok(())
    }
}

/// Highest accepted simulation rate, steps per second.
pub const MAX_STEP_RATE: f32 = 10_000.0;

/// Player physics parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParameters {
    /// Downward acceleration, blocks/s²
    pub gravity: f32,
    /// Radius of the player cylinder
    pub radius: f32,
    /// Height of the player cylinder
    pub height: f32,
    /// Horizontal speed at full input
    pub max_speed: f32,
    /// Upward speed given by a jump
    pub jump_speed: f32,
    /// Fixed simulation rate, steps per second
    pub step_rate: f32,
}

impl Default for PhysicsParameters {
    fn default() -> Self {
        PhysicsParameters {
            gravity: 32.0,
            radius: 0.5,
            height: 1.75,
            max_speed: 6.0,
            jump_speed: 10.0,
            step_rate: 200.0,
        }
    }
}

impl PhysicsParameters {
    /// Length of one simulation step, in seconds.
    pub fn step_size(&self) -> f32 {
        1.0 / self.step_rate
    }

    /// Rejects parameter sets the solver cannot step.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.step_rate > 0.0 && self.step_rate <= MAX_STEP_RATE,
            "step_rate must be in (0, {MAX_STEP_RATE}], got {}",
            self.step_rate
        );
        for (name, value) in [("radius", self.radius), ("height", self.height)] {
            ensure!(
                value.is_finite() && value > 0.0,
                "{name} must be a positive finite number, got {value}"
            );
        }
        for (name, value) in [
            ("gravity", self.gravity),
            ("max_speed", self.max_speed),
            ("jump_speed", self.jump_speed),
        ] {
            ensure!(value.is_finite(), "{name} must be finite, got {value}");
        }
        Ok(())
    }
}

/// Everything the host configures, in one snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunk dimensions
    pub size: WorldSize,
    /// Terrain generation parameters
    pub terrain: TerrainParameters,
    /// Player physics parameters
    pub physics: PhysicsParameters,
    /// Chunks kept loaded around the player, in chunks along each axis
    pub load_radius: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            size: WorldSize::default(),
            terrain: TerrainParameters::default(),
            physics: PhysicsParameters::default(),
            load_radius: 2,
        }
    }
}

impl WorldConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: WorldConfig = serde_json::from_str(json).context("parsing world config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every part of the snapshot.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.size.validate()?;
        self.terrain.validate()?;
        self.physics.validate()?;
        ensure!(self.load_radius >= 0, "load_radius must not be negative");
        Ok(())
    }
}
