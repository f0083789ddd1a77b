//! Randomness for the simulation: a seedable scalar/vector source and the
//! coherent noise that drives surface wobble.

use std::ops::Range;

use bevy::math::{Vec2, Vec3};
use noiz::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Seedable random source owned by a simulation.
///
/// Every random decision of the simulation goes through one of these so a
/// seeded simulation replays identically.
pub struct DropRng {
    rng: StdRng,
}

impl DropRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is set, entropy-seeded otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Uniform sample in `range`. An empty range yields its start.
    pub fn range(&mut self, range: Range<f32>) -> f32 {
        if range.start >= range.end {
            return range.start;
        }
        self.rng.gen_range(range)
    }

    /// Uniform sample in `[-extent, extent]`, zero for a zero extent.
    pub fn symmetric(&mut self, extent: f32) -> f32 {
        let extent = extent.abs();
        if extent == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-extent..=extent)
    }

    /// Uniform index in `0..len`; `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Uniform point inside the unit sphere.
    pub fn inside_unit_sphere(&mut self) -> Vec3 {
        loop {
            let candidate = Vec3::new(
                self.rng.gen_range(-1.0..=1.0),
                self.rng.gen_range(-1.0..=1.0),
                self.rng.gen_range(-1.0..=1.0),
            );
            if candidate.length_squared() <= 1.0 {
                return candidate;
            }
        }
    }
}

/// Coherent noise keyed by a scalar phase.
///
/// Each axis samples the same Perlin field along a different line, so the
/// three components are smooth in the phase but decorrelated from each other.
#[derive(Clone)]
pub struct SurfaceNoise {
    perlin: Noise<common_noise::Perlin>,
}

impl SurfaceNoise {
    pub fn new(seed: u32) -> Self {
        let mut perlin = Noise::<common_noise::Perlin>::default();
        perlin.set_seed(seed);
        Self { perlin }
    }

    /// Signed noise in roughly `[-1, 1]`.
    #[inline]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        self.perlin.sample_for::<f32>(Vec2::new(x, y)).clamp(-1.0, 1.0)
    }

    /// Three decorrelated signed samples for `phase`.
    pub fn sample_vec3(&self, phase: f32) -> Vec3 {
        Vec3::new(
            self.sample(phase, 0.0),
            self.sample(0.0, phase),
            self.sample(-phase, 0.0),
        )
    }
}

impl Default for SurfaceNoise {
    fn default() -> Self {
        Self::new(0)
    }
}

#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let mut a = DropRng::seeded(7);
        let mut b = DropRng::seeded(7);

        for _ in 0..16 {
            assert_eq!(a.range(0.0..10.0), b.range(0.0..10.0));
        }
        assert_eq!(a.inside_unit_sphere(), b.inside_unit_sphere());
    }

    #[test]
    fn test_range_bounds() {
        let mut rng = DropRng::seeded(1);
        for _ in 0..256 {
            let value = rng.range(1.0..2.0);
            assert!((1.0..2.0).contains(&value));
        }
        assert_eq!(rng.range(3.0..3.0), 3.0);
        assert_eq!(rng.symmetric(0.0), 0.0);
    }

    #[test]
    fn test_inside_unit_sphere() {
        let mut rng = DropRng::seeded(3);
        for _ in 0..256 {
            assert!(rng.inside_unit_sphere().length() <= 1.0);
        }
    }

    #[test]
    fn test_noise_is_smooth_in_phase() {
        let noise = SurfaceNoise::new(11);
        let a = noise.sample_vec3(3.25);
        let b = noise.sample_vec3(3.2501);

        assert!((a - b).length() < 0.01);
        assert!(a.abs().max_element() <= 1.0);
    }

    #[test]
    fn test_inverse_lerp_clamps() {
        assert!((inverse_lerp(0.0, 0.1, 0.05) - 0.5).abs() < 1e-6);
        assert_eq!(inverse_lerp(0.0, 0.1, 1.0), 1.0);
        assert_eq!(inverse_lerp(0.0, 0.1, -1.0), 0.0);
        assert_eq!(inverse_lerp(1.0, 1.0, 5.0), 0.0);
    }
}
