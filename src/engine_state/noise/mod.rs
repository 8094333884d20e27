//! # Noise Field
//!
//! Deterministic scalar noise, as pure functions of a seed and a coordinate.
//!
//! ## Components
//!
//! * `Mwc` - multiply-with-carry generator every layer is seeded from
//! * `GradientNoise` - coherent simplex noise, 2D and 3D
//! * `fbm_2d` / `ridged_fbm_2d` - octave sums
//! * `domain_warp` - coordinate perturbation that breaks up axis-aligned artifacts
//! * `MonotonicSpline` - Hermite remap from a noise value to a height curve
//!
//! Layers are built once, in a fixed order, from one seeded generator. Two
//! samplers built from the same seed therefore agree on every sample.

mod fractal;
mod generator;
mod spline;

pub use fractal::{
    domain_warp, fbm_2d, lerp, ridged_fbm_2d, smoothstep, FbmParams, WARP_DECORRELATION_OFFSET,
};
pub use generator::{GradientNoise, Mwc};
pub use spline::{MonotonicSpline, SplinePoint};
