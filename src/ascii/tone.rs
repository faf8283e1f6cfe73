//! Tone mapping and luma-to-glyph mapping.
//!
//! The stage order is fixed: luma, grain, contrast, brightness, clamp, gamma,
//! clamp, invert, bucket. Output stays compatible with captures made by
//! other builds only as long as this order and the constants below hold.
//! Every stage runs in `f64` so bucket edges land where double-precision
//! builds put them.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::palette::GlyphPalette;
use crate::settings::AdjustmentSettings;

/// Rec. 601 luma weights.
pub const LUMA_R: f64 = 0.299;
pub const LUMA_G: f64 = 0.587;
pub const LUMA_B: f64 = 0.114;

/// Mid-gray pivot for contrast.
pub const CONTRAST_PIVOT: f64 = 128.0;

/// Bucket divisor. 256 rather than 255 spreads the range evenly over the
/// palette; full white still lands in the last bucket.
pub const BUCKET_DIVISOR: f64 = 256.0;

/// Source of uniform random numbers in `[0, 1)` for the grain stage.
pub trait NoiseSource {
    fn next_uniform(&mut self) -> f64;
}

/// Reproducible noise from a seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededNoise {
    rng: StdRng,
}

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl NoiseSource for SeededNoise {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Noise from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadNoise;

impl NoiseSource for ThreadNoise {
    fn next_uniform(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Always returns the same draw. 0.5 is a zero perturbation.
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise(pub f64);

impl NoiseSource for FixedNoise {
    fn next_uniform(&mut self) -> f64 {
        self.0
    }
}

/// Perceptual luma of an RGB sample.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    LUMA_R * r as f64 + LUMA_G * g as f64 + LUMA_B * b as f64
}

/// Run the tone pipeline on one luma value. Returns a value in `[0, 255]`.
///
/// `noise` is only consulted when `settings.noise_amount > 0`.
pub fn tone_map(luma: f64, settings: &AdjustmentSettings, noise: &mut dyn NoiseSource) -> f64 {
    let mut value = luma;

    if settings.noise_amount > 0.0 {
        value += (noise.next_uniform() - 0.5) * settings.noise_amount * 255.0;
    }

    value = (value - CONTRAST_PIVOT) * settings.contrast + CONTRAST_PIVOT;
    value += settings.brightness_offset as f64;
    value = value.clamp(0.0, 255.0);

    if settings.gamma != 1.0 {
        value = 255.0 * (value / 255.0).powf(1.0 / settings.gamma);
    }
    value = value.clamp(0.0, 255.0);

    if settings.inverted {
        value = 255.0 - value;
    }

    value
}

/// Bucket a tone-mapped luma into a palette index.
#[inline]
pub fn bucket_index(value: f64, palette_len: usize) -> usize {
    if palette_len == 0 {
        return 0;
    }
    let idx = ((value / BUCKET_DIVISOR) * palette_len as f64).floor();
    (idx.max(0.0) as usize).min(palette_len - 1)
}

/// Glyph index for one RGB sample.
pub fn glyph_index(
    r: u8,
    g: u8,
    b: u8,
    settings: &AdjustmentSettings,
    palette_len: usize,
    noise: &mut dyn NoiseSource,
) -> usize {
    bucket_index(tone_map(luma(r, g, b), settings, noise), palette_len)
}

/// Map one RGB sample to a glyph from `palette`.
pub fn map_pixel(
    r: u8,
    g: u8,
    b: u8,
    settings: &AdjustmentSettings,
    palette: &GlyphPalette,
    noise: &mut dyn NoiseSource,
) -> char {
    palette.glyph(glyph_index(r, g, b, settings, palette.len(), noise))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ascii::PaletteId;

    fn quiet() -> FixedNoise {
        FixedNoise(0.5)
    }

    #[test]
    fn test_luma_weights() {
        assert!((luma(255, 0, 0) - 76.245).abs() < 1e-3);
        assert!((luma(0, 255, 0) - 149.685).abs() < 1e-3);
        assert!((luma(0, 0, 255) - 29.07).abs() < 1e-3);
        assert!((luma(255, 255, 255) - 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_identity_settings_pass_luma_through() {
        let s = AdjustmentSettings::default();
        assert!((tone_map(100.0, &s, &mut quiet()) - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_noise_not_drawn_when_disabled() {
        struct Panicky;
        impl NoiseSource for Panicky {
            fn next_uniform(&mut self) -> f64 {
                panic!("noise should not be drawn");
            }
        }
        let s = AdjustmentSettings::default();
        tone_map(50.0, &s, &mut Panicky);
    }

    #[test]
    fn test_noise_offsets_by_scaled_draw() {
        let s = AdjustmentSettings {
            noise_amount: 0.5,
            ..Default::default()
        };
        // (1.0 - 0.5) * 0.5 * 255 = 63.75
        let v = tone_map(100.0, &s, &mut FixedNoise(1.0));
        assert!((v - 163.75).abs() < 1e-3);
    }

    #[test]
    fn test_contrast_pivots_on_mid_gray() {
        let s = AdjustmentSettings {
            contrast: 2.0,
            ..Default::default()
        };
        assert!((tone_map(128.0, &s, &mut quiet()) - 128.0).abs() < 1e-4);
        assert!((tone_map(138.0, &s, &mut quiet()) - 148.0).abs() < 1e-4);
        assert_eq!(tone_map(250.0, &s, &mut quiet()), 255.0);
    }

    #[test]
    fn test_brightness_applied_before_clamp() {
        let s = AdjustmentSettings {
            brightness_offset: -100,
            ..Default::default()
        };
        assert_eq!(tone_map(50.0, &s, &mut quiet()), 0.0);
    }

    #[test]
    fn test_gamma_two_on_64() {
        let s = AdjustmentSettings {
            gamma: 2.0,
            ..Default::default()
        };
        let v = tone_map(64.0, &s, &mut quiet());
        assert!((v - 127.75).abs() < 0.5, "got {}", v);
    }

    #[test]
    fn test_bucket_edge_resolved_in_double_precision() {
        // luma lands a hair under 128, the edge between buckets 5 and 6
        let s = AdjustmentSettings::default();
        let l = luma(34, 192, 45);
        assert!(l < 128.0 && l > 127.999);
        assert_eq!(glyph_index(34, 192, 45, &s, 12, &mut quiet()), 5);
    }

    #[test]
    fn test_bucket_uses_256_divisor() {
        assert_eq!(bucket_index(0.0, 12), 0);
        assert_eq!(bucket_index(255.0, 12), 11);
        // 21.33.. is the first value of bucket 1 with /256
        assert_eq!(bucket_index(21.0, 12), 0);
        assert_eq!(bucket_index(21.4, 12), 1);
        assert_eq!(bucket_index(-3.0, 12), 0);
        assert_eq!(bucket_index(300.0, 12), 11);
    }

    #[test]
    fn test_map_pixel_standard_extremes() {
        let s = AdjustmentSettings::default();
        let palette = PaletteId::Standard.palette();
        assert_eq!(map_pixel(0, 0, 0, &s, &palette, &mut quiet()), ' ');
        assert_eq!(map_pixel(255, 255, 255, &s, &palette, &mut quiet()), 'B');
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let mut a = SeededNoise::new(7);
        let mut b = SeededNoise::new(7);
        for _ in 0..16 {
            let x = a.next_uniform();
            assert_eq!(x, b.next_uniform());
            assert!((0.0..1.0).contains(&x));
        }
    }
}
