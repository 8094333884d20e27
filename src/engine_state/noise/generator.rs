//! Seeded pseudo-random source and the gradient noise built on top of it.

use noise::{NoiseFn, Simplex};

const W_SEED: u32 = 123_456_789;
const Z_SEED: u32 = 987_654_321;

/// Multiply-with-carry generator.
///
/// Two 32-bit state words, each advanced by its own MWC recurrence. Cheap,
/// deterministic across platforms and reseedable in place, which is all the
/// terrain pipeline asks of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mwc {
    w: u32,
    z: u32,
}

impl Mwc {
    /// Creates a generator seeded with `seed`.
    pub fn new(seed: u32) -> Self {
        let mut generator = Mwc { w: W_SEED, z: Z_SEED };
        generator.seed(seed);
        generator
    }

    /// Reinitializes both state words from `i`.
    pub fn seed(&mut self, i: u32) {
        self.w = W_SEED.wrapping_add(i);
        self.z = Z_SEED.wrapping_sub(i);
    }

    /// Next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.z = 36969u32
            .wrapping_mul(self.z & 0xFFFF)
            .wrapping_add(self.z >> 16);
        self.w = 18000u32
            .wrapping_mul(self.w & 0xFFFF)
            .wrapping_add(self.w >> 16);
        (self.z << 16).wrapping_add(self.w & 0xFFFF)
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }
}

/// Coherent simplex noise whose permutation is drawn from an `Mwc`.
///
/// Output is continuous, in `[-1, 1]`, and identical for identical generator
/// state and coordinates.
#[derive(Clone, Debug)]
pub struct GradientNoise {
    simplex: Simplex,
}

impl GradientNoise {
    /// Builds a noise layer, consuming one word from `generator`.
    pub fn from_generator(generator: &mut Mwc) -> Self {
        GradientNoise {
            simplex: Simplex::new(generator.next_u32()),
        }
    }

    /// Samples the 2D field.
    pub fn sample_2d(&self, x: f64, y: f64) -> f64 {
        self.simplex.get([x, y]).clamp(-1.0, 1.0)
    }

    /// Samples the 3D field.
    pub fn sample_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.simplex.get([x, y, z]).clamp(-1.0, 1.0)
    }
}
