//! Procedural twinkling starfield.
//!
//! Stars are generated once from a seed and never change; only their
//! brightness is recomputed from time each frame.

use std::f64::consts::TAU;

use glam::Vec3;
use orrery_config::StarfieldConfig;
use orrery_render::StarInstance;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Point-size class of a star.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeBucket {
    Small,
    Medium,
    Large,
}

impl SizeBucket {
    pub fn from_base_size(base_size: f32) -> Self {
        if base_size < 1.5 {
            SizeBucket::Small
        } else if base_size < 2.0 {
            SizeBucket::Medium
        } else {
            SizeBucket::Large
        }
    }

    /// Sprite diameter in pixels.
    pub fn point_size(self) -> f32 {
        match self {
            SizeBucket::Small => 1.2,
            SizeBucket::Medium => 2.2,
            SizeBucket::Large => 3.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Star {
    /// Unit direction on the sky sphere.
    pub direction: Vec3,
    pub base_size: f32,
    pub bucket: SizeBucket,
    pub phase: f32,
    /// Seconds per twinkle cycle.
    pub twinkle_period: f32,
    pub base_brightness: f32,
    /// Warm/cool colour-temperature tint.
    pub tint: [f32; 3],
}

impl Star {
    /// `base · (0.5 + 0.5·sin(2π·t/period + phase))`
    pub fn brightness(&self, time: f64) -> f32 {
        let wave = (TAU * time / self.twinkle_period as f64 + self.phase as f64).sin() as f32;
        self.base_brightness * (0.5 + 0.5 * wave)
    }

    /// Tinted colour at `time`, each channel clamped to 1.
    pub fn color(&self, time: f64) -> [f32; 4] {
        let b = self.brightness(time);
        [
            (self.tint[0] * b).min(1.0),
            (self.tint[1] * b).min(1.0),
            (self.tint[2] * b).min(1.0),
            1.0,
        ]
    }
}

/// Tint from a star's base size: larger stars are warmer.
pub fn temperature_tint(base_size: f32) -> [f32; 3] {
    let warmth = base_size / 2.5;
    [0.9 + 0.1 * warmth, 1.0, 1.1 - 0.1 * warmth]
}

/// Uniform direction on the unit sphere by Marsaglia's rejection method.
pub fn marsaglia_direction(rng: &mut impl Rng) -> Vec3 {
    loop {
        let u: f32 = rng.random_range(-1.0..1.0);
        let v: f32 = rng.random_range(-1.0..1.0);
        let s = u * u + v * v;
        if s >= 1.0 {
            continue;
        }
        let root = (1.0 - s).sqrt();
        return Vec3::new(2.0 * u * root, 2.0 * v * root, 1.0 - 2.0 * s).normalize();
    }
}

/// Generates a deterministic star catalogue from a seed.
pub struct StarfieldGenerator {
    seed: u64,
    settings: StarfieldConfig,
}

impl StarfieldGenerator {
    pub fn new(settings: &StarfieldConfig) -> Self {
        Self {
            seed: settings.seed,
            settings: settings.clone(),
        }
    }

    pub fn generate(&self) -> Vec<Star> {
        let cfg = &self.settings;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let speed_range = ordered(cfg.min_twinkle_speed, cfg.max_twinkle_speed);
        let brightness_range = ordered(cfg.min_brightness, cfg.max_brightness);

        let stars: Vec<Star> = (0..cfg.count)
            .map(|_| {
                let direction = marsaglia_direction(&mut rng);
                let phase = rng.random_range(0.0..std::f32::consts::TAU);
                let speed = sample(&mut rng, speed_range);
                let base_size = rng.random_range(1.0..2.5);
                let base_brightness = sample(&mut rng, brightness_range);
                Star {
                    direction,
                    base_size,
                    bucket: SizeBucket::from_base_size(base_size),
                    phase,
                    twinkle_period: std::f32::consts::TAU / speed.max(f32::EPSILON),
                    base_brightness,
                    tint: temperature_tint(base_size),
                }
            })
            .collect();
        tracing::debug!("Generated {} stars (seed {:#x})", stars.len(), self.seed);
        stars
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

fn sample(rng: &mut impl Rng, (lo, hi): (f32, f32)) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

/// Generated stars placed on a sphere around the eye.
pub struct Starfield {
    stars: Vec<Star>,
    radius: f32,
}

impl Starfield {
    pub fn new(stars: Vec<Star>, radius: f32) -> Self {
        Self { stars, radius }
    }

    pub fn generate(settings: &StarfieldConfig) -> Self {
        Self::new(StarfieldGenerator::new(settings).generate(), settings.radius)
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Rewrite `out` with one sprite per star at `time`.
    pub fn write_instances(&self, time: f64, out: &mut Vec<StarInstance>) {
        out.clear();
        out.extend(self.stars.iter().map(|star| StarInstance {
            position: (star.direction * self.radius).to_array(),
            size_px: star.bucket.point_size(),
            color: star.color(time),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StarfieldConfig {
        StarfieldConfig::default()
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = StarfieldGenerator::new(&config()).generate();
        let b = StarfieldGenerator::new(&config()).generate();
        assert_eq!(a, b);
        let other = StarfieldGenerator::new(&StarfieldConfig {
            seed: 1,
            ..config()
        })
        .generate();
        assert_ne!(a[0].direction, other[0].direction);
    }

    #[test]
    fn test_directions_are_unit_and_centred() {
        let stars = StarfieldGenerator::new(&config()).generate();
        assert_eq!(stars.len(), 2500);
        let mut sum = Vec3::ZERO;
        for star in &stars {
            assert!((star.direction.length() - 1.0).abs() < 1e-4);
            sum += star.direction;
        }
        let mean = sum / stars.len() as f32;
        // Each coordinate has variance 1/3; 0.06 is about five standard errors.
        assert!(mean.abs().max_element() < 0.06, "mean {mean}");
    }

    #[test]
    fn test_parameters_within_configured_ranges() {
        let cfg = config();
        for star in StarfieldGenerator::new(&cfg).generate() {
            assert!((1.0..2.5).contains(&star.base_size));
            assert!((cfg.min_brightness..=cfg.max_brightness).contains(&star.base_brightness));
            let speed = std::f32::consts::TAU / star.twinkle_period;
            assert!(speed >= cfg.min_twinkle_speed - 1e-4);
            assert!(speed <= cfg.max_twinkle_speed + 1e-4);
            assert!((0.0..std::f32::consts::TAU).contains(&star.phase));
            assert_eq!(star.bucket, SizeBucket::from_base_size(star.base_size));
        }
    }

    #[test]
    fn test_all_buckets_populated() {
        let stars = StarfieldGenerator::new(&config()).generate();
        for bucket in [SizeBucket::Small, SizeBucket::Medium, SizeBucket::Large] {
            assert!(stars.iter().any(|s| s.bucket == bucket));
        }
    }

    #[test]
    fn test_brightness_formula() {
        let star = Star {
            direction: Vec3::Z,
            base_size: 2.5,
            bucket: SizeBucket::Large,
            phase: 0.0,
            twinkle_period: 4.0,
            base_brightness: 0.8,
            tint: temperature_tint(2.5),
        };
        assert!((star.brightness(0.0) - 0.4).abs() < 1e-6);
        assert!((star.brightness(1.0) - 0.8).abs() < 1e-6);
        assert!(star.brightness(3.0).abs() < 1e-6);
        assert!((star.brightness(4.0) - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_tint_and_color_clamp() {
        assert_eq!(temperature_tint(2.5), [1.0, 1.0, 1.0]);
        let cool = temperature_tint(1.0);
        assert!(cool[2] > cool[0]);

        let star = Star {
            direction: Vec3::Z,
            base_size: 1.0,
            bucket: SizeBucket::Small,
            phase: std::f32::consts::FRAC_PI_2,
            twinkle_period: 10.0,
            base_brightness: 1.0,
            tint: cool,
        };
        let c = star.color(0.0);
        assert_eq!(c[2], 1.0);
        assert!((c[0] - 0.94).abs() < 1e-5);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(SizeBucket::from_base_size(1.0), SizeBucket::Small);
        assert_eq!(SizeBucket::from_base_size(1.5), SizeBucket::Medium);
        assert_eq!(SizeBucket::from_base_size(2.0), SizeBucket::Large);
        assert_eq!(SizeBucket::Large.point_size(), 3.5);
    }

    #[test]
    fn test_write_instances_places_stars_on_radius() {
        let field = Starfield::generate(&StarfieldConfig {
            count: 64,
            ..config()
        });
        let mut instances = Vec::new();
        field.write_instances(2.0, &mut instances);
        assert_eq!(instances.len(), 64);
        for inst in &instances {
            let r = Vec3::from(inst.position).length();
            assert!((r - 2000.0).abs() < 0.5);
            assert!(inst.color.iter().all(|c| (0.0..=1.0).contains(c)));
        }
        field.write_instances(3.0, &mut instances);
        assert_eq!(instances.len(), 64);
    }
}
