//! Octave summation, ridges and domain warping over a `GradientNoise` layer.

use super::GradientNoise;

/// Offset added to the second warp sample so the two axes are decorrelated.
pub const WARP_DECORRELATION_OFFSET: f64 = 5_219.37;

/// Amplitude sums at or below this are treated as degenerate.
const MIN_AMPLITUDE_SUM: f64 = 1e-9;

/// Parameters of one fractal sum.
///
/// `scale` is the wavelength of the first octave in blocks. Each following
/// octave multiplies the frequency by `lacunarity` and the amplitude by
/// `persistence`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FbmParams {
    /// Wavelength of the first octave, in blocks
    pub scale: f64,
    /// Number of octaves summed
    pub octaves: u32,
    /// Amplitude multiplier per octave
    pub persistence: f64,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
    /// Scales the normalized sum
    pub amplitude: f64,
    /// Added after scaling
    pub offset: f64,
}

impl FbmParams {
    /// Doubling frequency, halving amplitude, no rescale.
    pub fn new(scale: f64, octaves: u32) -> Self {
        FbmParams {
            scale,
            octaves,
            persistence: 0.5,
            lacunarity: 2.0,
            amplitude: 1.0,
            offset: 0.0,
        }
    }

    /// Same octaves, rescaled to `value * amplitude + offset`.
    pub fn rescaled(self, amplitude: f64, offset: f64) -> Self {
        FbmParams {
            amplitude,
            offset,
            ..self
        }
    }
}

/// Fractal Brownian motion.
///
/// The octave sum is divided by the largest possible sum, so the value is in
/// `[-1, 1]` before `amplitude`/`offset` are applied. Zero octaves or a
/// degenerate amplitude sum yield `offset`.
pub fn fbm_2d(noise: &GradientNoise, params: &FbmParams, x: f64, z: f64) -> f64 {
    if params.octaves == 0 || params.scale.abs() < f64::EPSILON {
        return params.offset;
    }

    let mut amplitude = 1.0;
    let mut frequency = 1.0 / params.scale;
    let mut total = 0.0;
    let mut max_total = 0.0;

    for _ in 0..params.octaves {
        total += noise.sample_2d(x * frequency, z * frequency) * amplitude;
        max_total += amplitude;
        amplitude *= params.persistence;
        frequency *= params.lacunarity;
    }

    if max_total <= MIN_AMPLITUDE_SUM {
        return params.offset;
    }

    (total / max_total) * params.amplitude + params.offset
}

/// Ridged fractal sum in `[0, 1]`.
///
/// Each octave contributes `1 - |noise|`, folding troughs into sharp crests.
pub fn ridged_fbm_2d(noise: &GradientNoise, params: &FbmParams, x: f64, z: f64) -> f64 {
    if params.octaves == 0 || params.scale.abs() < f64::EPSILON {
        return 0.0;
    }

    let mut amplitude = 1.0;
    let mut frequency = 1.0 / params.scale;
    let mut total = 0.0;
    let mut max_total = 0.0;

    for _ in 0..params.octaves {
        let ridge = 1.0 - noise.sample_2d(x * frequency, z * frequency).abs();
        total += ridge * amplitude;
        max_total += amplitude;
        amplitude *= params.persistence;
        frequency *= params.lacunarity;
    }

    if max_total <= MIN_AMPLITUDE_SUM {
        return 0.0;
    }

    (total / max_total).clamp(0.0, 1.0)
}

/// Displacement `(dx, dz)` to apply to a sampling coordinate.
pub fn domain_warp(noise: &GradientNoise, x: f64, z: f64, scale: f64, strength: f64) -> (f64, f64) {
    if scale.abs() < f64::EPSILON {
        return (0.0, 0.0);
    }
    let u = x / scale;
    let v = z / scale;
    let dx = noise.sample_2d(u, v) * strength;
    let dz = noise.sample_2d(u + WARP_DECORRELATION_OFFSET, v + WARP_DECORRELATION_OFFSET) * strength;
    (dx, dz)
}

/// Hermite smoothstep of `x` between `edge0` and `edge1`.
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linear interpolation.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::noise::Mwc;
    use approx::assert_relative_eq;
    use test_case::test_case;

    fn layer(seed: u32) -> GradientNoise {
        GradientNoise::from_generator(&mut Mwc::new(seed))
    }

    #[test_case(1)]
    #[test_case(3)]
    #[test_case(8)]
    fn fbm_stays_normalized(octaves: u32) {
        let noise = layer(11);
        let params = FbmParams::new(30.0, octaves);
        for i in 0..500 {
            let value = fbm_2d(&noise, &params, i as f64 * 3.7, i as f64 * -1.3);
            assert!((-1.0..=1.0).contains(&value), "{value}");
        }
    }

    #[test]
    fn fbm_applies_amplitude_and_offset() {
        let noise = layer(11);
        let raw = FbmParams::new(30.0, 4);
        let scaled = raw.rescaled(0.5, 0.2);
        let a = fbm_2d(&noise, &raw, 17.0, 4.0);
        let b = fbm_2d(&noise, &scaled, 17.0, 4.0);
        assert_relative_eq!(b, a * 0.5 + 0.2, epsilon = 1e-12);
    }

    #[test]
    fn zero_octaves_yield_offset() {
        let noise = layer(3);
        let params = FbmParams::new(30.0, 0).rescaled(2.0, 0.75);
        assert_eq!(fbm_2d(&noise, &params, 10.0, 10.0), 0.75);
        assert_eq!(ridged_fbm_2d(&noise, &params, 10.0, 10.0), 0.0);
    }

    #[test]
    fn zero_persistence_keeps_only_the_first_octave() {
        let noise = layer(3);
        let params = FbmParams {
            persistence: 0.0,
            ..FbmParams::new(30.0, 4)
        };
        // Only the first octave carries weight; still normalized.
        let value = fbm_2d(&noise, &params, 3.0, 9.0);
        assert_relative_eq!(value, noise.sample_2d(3.0 / 30.0, 9.0 / 30.0), epsilon = 1e-12);
    }

    #[test]
    fn ridged_is_unit_bounded() {
        let noise = layer(19);
        let params = FbmParams::new(60.0, 4);
        for i in 0..500 {
            let value = ridged_fbm_2d(&noise, &params, i as f64 * 2.1, i as f64 * 0.7);
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn warp_axes_are_decorrelated_and_bounded() {
        let noise = layer(23);
        let mut differing = 0;
        for i in 0..100 {
            let (dx, dz) = domain_warp(&noise, i as f64 * 5.0, i as f64 * 3.0, 60.0, 12.0);
            assert!(dx.abs() <= 12.0 && dz.abs() <= 12.0);
            if (dx - dz).abs() > 1e-6 {
                differing += 1;
            }
        }
        assert!(differing > 90);
    }

    #[test_case(-1.0, 0.0)]
    #[test_case(0.2, 0.5)]
    #[test_case(2.0, 1.0)]
    fn smoothstep_clamps_and_centers(x: f64, expected: f64) {
        assert_relative_eq!(smoothstep(-0.2, 0.6, x), expected, epsilon = 1e-12);
    }
}
