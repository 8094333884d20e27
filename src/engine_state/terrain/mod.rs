//! # Terrain Sampler
//!
//! Combines the noise layers into per-column height, biome and per-voxel
//! resource decisions. Chunk generation asks the sampler; the sampler never
//! looks at chunk data, so every decision is a pure function of the parameter
//! snapshot and the global coordinate.
//!
//! ## Height pipeline
//!
//! 1. Domain-warp the column coordinate.
//! 2. Continentalness: `0.6·center + 0.1·(4 neighbours)` of an fbm sample,
//!    neighbours `max(8, 0.15·scale)` blocks away.
//! 3. Peaks and valleys: ridged fbm.
//! 4. Erosion mask: fbm remapped to `[0, 1]`.
//! 5. Continentalness through the height curve gives the base height.
//! 6. Ridges are added, scaled by inland factor, squash and erosion.
//! 7. Per chunk, a slope limiter keeps neighbouring columns within `MAX_STEP`.

use crate::engine_state::{
    config::{TerrainParameters, WorldSize},
    noise::{
        domain_warp, fbm_2d, lerp, ridged_fbm_2d, smoothstep, FbmParams, GradientNoise,
        MonotonicSpline, Mwc, SplinePoint,
    },
    voxels::block::block_type::BlockType,
};

pub mod biome;
pub mod resources;

use biome::Biome;
use resources::{ResourceDefinition, RESOURCES};

/// Largest height difference allowed between axis-adjacent columns of a chunk.
pub const MAX_STEP: i32 = 3;

/// Depth of the soil layer between the surface and stone.
pub const SOIL_DEPTH: i32 = 16;

/// Weight of the center tap of the continentalness kernel.
const CENTER_WEIGHT: f64 = 0.6;
/// Weight of each of the four neighbour taps.
const NEIGHBOUR_WEIGHT: f64 = 0.1;

const MICRO_SCALE: f64 = 16.0;
const MICRO_AMPLITUDE: f64 = 0.75;

/// Height curve: continentalness to relief, as a fraction of world height
/// relative to the sea plane. Flat lowlands around the coast, steep highlands.
const HEIGHT_CURVE: [SplinePoint; 6] = [
    SplinePoint::new(-1.0, -0.30, 0.0),
    SplinePoint::new(-0.45, -0.12, 0.4),
    SplinePoint::new(-0.1, 0.0, 0.15),
    SplinePoint::new(0.25, 0.06, 0.3),
    SplinePoint::new(0.55, 0.35, 1.4),
    SplinePoint::new(1.0, 0.80, 0.6),
];

/// Raw (unsmoothed) terrain values of one column.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColumnSample {
    /// Surface height after flooring and clamping, before slope limiting
    pub height: i32,
    /// Smoothed continentalness, clamped to `[-1, 1]`
    pub continentalness: f64,
    /// Ridged peaks-and-valleys signal in `[0, 1]`
    pub peaks: f64,
    /// Erosion mask in `[0, 1]`
    pub erosion: f64,
}

/// Tree dimensions decided for one column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TreeShape {
    /// Trunk block
    pub trunk: BlockType,
    /// Trunk height in blocks
    pub trunk_height: i32,
    /// Canopy block and radius; `None` for trunk-only plants
    pub canopy: Option<(BlockType, i32)>,
}

/// Slope-limited surface heights of one chunk, indexed `[x][z]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeightMap {
    width: usize,
    heights: Vec<i32>,
}

impl HeightMap {
    /// Surface height of local column `(x, z)`.
    pub fn get(&self, x: usize, z: usize) -> i32 {
        self.heights[x * self.width + z]
    }

    /// Columns along each horizontal axis.
    pub fn width(&self) -> usize {
        self.width
    }

    fn set(&mut self, x: usize, z: usize, height: i32) {
        self.heights[x * self.width + z] = height;
    }

    fn lower_to(&mut self, x: usize, z: usize, bound: i32) {
        if bound < self.get(x, z) {
            self.set(x, z, bound);
        }
    }
}

/// Per-column and per-voxel terrain decisions for one parameter snapshot.
pub struct TerrainSampler {
    params: TerrainParameters,
    size: WorldSize,
    warp: GradientNoise,
    continental: GradientNoise,
    peaks: GradientNoise,
    erosion: GradientNoise,
    micro: GradientNoise,
    biome: GradientNoise,
    trees: GradientNoise,
    canopy: GradientNoise,
    resources: Vec<(&'static ResourceDefinition, GradientNoise)>,
    height_curve: MonotonicSpline,
}

impl TerrainSampler {
    /// Builds every noise layer from one generator seeded with `params.seed`.
    ///
    /// The draw order is fixed, so two samplers built from equal snapshots
    /// agree on every decision.
    pub fn new(params: TerrainParameters, size: WorldSize) -> Self {
        let mut generator = Mwc::new(params.seed);
        let warp = GradientNoise::from_generator(&mut generator);
        let continental = GradientNoise::from_generator(&mut generator);
        let peaks = GradientNoise::from_generator(&mut generator);
        let erosion = GradientNoise::from_generator(&mut generator);
        let micro = GradientNoise::from_generator(&mut generator);
        let biome = GradientNoise::from_generator(&mut generator);
        let trees = GradientNoise::from_generator(&mut generator);
        let canopy = GradientNoise::from_generator(&mut generator);
        let resources = RESOURCES
            .iter()
            .map(|definition| (definition, GradientNoise::from_generator(&mut generator)))
            .collect();

        TerrainSampler {
            params,
            size,
            warp,
            continental,
            peaks,
            erosion,
            micro,
            biome,
            trees,
            canopy,
            resources,
            height_curve: MonotonicSpline::new(HEIGHT_CURVE.to_vec()),
        }
    }

    /// The parameter snapshot this sampler was built from.
    pub fn params(&self) -> &TerrainParameters {
        &self.params
    }

    /// The world size this sampler clamps heights to.
    pub fn size(&self) -> WorldSize {
        self.size
    }

    /// Raw terrain values of global column `(gx, gz)`.
    pub fn column(&self, gx: i32, gz: i32) -> ColumnSample {
        let p = &self.params;
        let (x, z) = (gx as f64, gz as f64);

        let (dx, dz) = domain_warp(&self.warp, x, z, p.scale * 2.0, p.warp_strength);
        let (wx, wz) = (x + dx, z + dz);

        let continental_params = FbmParams::new(p.scale, p.continental_octaves);
        let n_step = (0.15 * p.scale).max(8.0);
        let sample = |sx: f64, sz: f64| fbm_2d(&self.continental, &continental_params, sx, sz);
        let neighbours = sample(wx + n_step, wz)
            + sample(wx - n_step, wz)
            + sample(wx, wz + n_step)
            + sample(wx, wz - n_step);
        let continentalness =
            (CENTER_WEIGHT * sample(wx, wz) + NEIGHBOUR_WEIGHT * neighbours).clamp(-1.0, 1.0);

        let peaks = ridged_fbm_2d(&self.peaks, &FbmParams::new(p.pv_scale, p.pv_octaves), wx, wz);

        let erosion_params = FbmParams::new(p.erosion_scale, p.erosion_octaves).rescaled(0.5, 0.5);
        let erosion = fbm_2d(&self.erosion, &erosion_params, wx, wz).clamp(0.0, 1.0);

        let sea = p.sea_level as f64;
        let relief = self.height_curve.eval(continentalness);
        let base_height = sea + relief * p.magnitude * self.size.height as f64;

        let inland = smoothstep(-0.2, 0.6, continentalness);
        let altitude = ((base_height - sea) / (p.mountain_cap - p.sea_level) as f64).clamp(0.0, 1.0);
        let near_sea = 1.0 - smoothstep(0.0, 6.0, (base_height - sea).abs());
        let squash = lerp(0.3, 1.0, 1.0 - near_sea) * (1.0 + 0.5 * altitude);

        let ridges =
            peaks * p.pv_magnitude * squash * inland * (1.0 - p.erosion_strength * erosion);
        let micro = self.micro.sample_2d(x / MICRO_SCALE, z / MICRO_SCALE) * MICRO_AMPLITUDE;

        let height = base_height + p.offset * 16.0 + ridges + micro;

        ColumnSample {
            height: self.clamp_height(height.floor()),
            continentalness,
            peaks,
            erosion,
        }
    }

    /// Raw surface height of global column `(gx, gz)`, before slope limiting.
    pub fn raw_height(&self, gx: i32, gz: i32) -> i32 {
        self.column(gx, gz).height
    }

    fn clamp_height(&self, height: f64) -> i32 {
        let top = self.size.height as i32 - 1;
        if height.is_nan() {
            return 0;
        }
        (height.max(0.0).min(top as f64)) as i32
    }

    /// Slope-limited surface heights for the chunk at `(cx, cz)`.
    ///
    /// Columns on the chunk edge are first bounded by the raw heights of the
    /// columns just outside, re-derived here rather than read from a
    /// neighbour chunk. Two raster passes of `h = min(h, h_neighbour + MAX_STEP)`
    /// (forward, then backward) then give the exact lower envelope, so every
    /// pair of adjacent columns differs by at most `MAX_STEP`.
    pub fn height_map(&self, cx: i32, cz: i32) -> HeightMap {
        let width = self.size.width;
        let origin_x = cx * width as i32;
        let origin_z = cz * width as i32;

        let mut map = HeightMap {
            width,
            heights: vec![0; width * width],
        };
        for x in 0..width {
            for z in 0..width {
                let height = self.raw_height(origin_x + x as i32, origin_z + z as i32);
                map.set(x, z, height);
            }
        }

        let last = width - 1;
        for i in 0..width {
            let along = i as i32;
            let outside = [
                (i, 0, origin_x + along, origin_z - 1),
                (i, last, origin_x + along, origin_z + width as i32),
                (0, i, origin_x - 1, origin_z + along),
                (last, i, origin_x + width as i32, origin_z + along),
            ];
            for (x, z, gx, gz) in outside {
                let bound = self.raw_height(gx, gz) + MAX_STEP;
                map.lower_to(x, z, bound);
            }
        }

        for x in 0..width {
            for z in 0..width {
                if x > 0 {
                    let bound = map.get(x - 1, z) + MAX_STEP;
                    map.lower_to(x, z, bound);
                }
                if z > 0 {
                    let bound = map.get(x, z - 1) + MAX_STEP;
                    map.lower_to(x, z, bound);
                }
            }
        }
        for x in (0..width).rev() {
            for z in (0..width).rev() {
                if x < last {
                    let bound = map.get(x + 1, z) + MAX_STEP;
                    map.lower_to(x, z, bound);
                }
                if z < last {
                    let bound = map.get(x, z + 1) + MAX_STEP;
                    map.lower_to(x, z, bound);
                }
            }
        }

        map
    }

    /// Biome of global column `(gx, gz)` whose surface sits at `height`.
    ///
    /// Always sampled at the global coordinate so bands run continuously
    /// across chunk borders.
    pub fn biome_at(&self, gx: i32, gz: i32, height: i32) -> Biome {
        let channel = fbm_2d(
            &self.biome,
            &FbmParams::new(self.params.biome_scale, 3),
            gx as f64,
            gz as f64,
        );
        Biome::from_channel(channel).with_overrides(
            height,
            self.params.sea_level,
            self.params.mountain_cap,
        )
    }

    /// Resource claiming voxel `(gx, y, gz)`, if any.
    ///
    /// Layers are tried in table order; the first layer above its scarcity
    /// threshold wins.
    pub fn resource_at(&self, gx: i32, y: i32, gz: i32) -> Option<BlockType> {
        self.resources
            .iter()
            .find(|(definition, noise)| {
                let [sx, sy, sz] = definition.scale;
                noise.sample_3d(gx as f64 / sx, y as f64 / sy, gz as f64 / sz) > definition.scarcity
            })
            .map(|(definition, _)| definition.block_type)
    }

    /// Tree to plant on global column `(gx, gz)` in `biome`, if the tree
    /// channel falls inside the biome's band.
    pub fn tree_at(&self, gx: i32, gz: i32, biome: Biome) -> Option<TreeShape> {
        let profile = biome.profile();
        let (low, high) = profile.tree_band?;
        let scale = self.params.tree_scale;
        let value = self.trees.sample_2d(gx as f64 / scale, gz as f64 / scale);
        if value <= low || value > high {
            return None;
        }

        let pick = |range: (u32, u32), salt: f64| -> i32 {
            let (min, max) = range;
            let t = (self.canopy.sample_2d(gx as f64 * 0.37 + salt, gz as f64 * 0.37 - salt) + 1.0) * 0.5;
            let span = (max - min + 1) as f64;
            (min as i32 + (t * span).floor() as i32).min(max as i32)
        };

        Some(TreeShape {
            trunk: profile.trunk,
            trunk_height: pick(profile.trunk_height, 17.0),
            canopy: profile
                .leaves
                .map(|leaves| (leaves, pick(profile.canopy_radius, 113.0))),
        })
    }

    /// Whether a canopy voxel at `(gx, y, gz)` is thinned out.
    ///
    /// Only the outer shell (`distance² > (radius - 1)²`) is thinned, which
    /// keeps canopies roughly spherical.
    pub fn leaf_skip(&self, gx: i32, y: i32, gz: i32, distance_squared: i32, radius: i32) -> bool {
        if distance_squared <= (radius - 1) * (radius - 1) {
            return false;
        }
        self.canopy.sample_3d(gx as f64 * 0.5, y as f64 * 0.5, gz as f64 * 0.5) > 0.5
    }
}
