//! Adjustment settings for the glyph pipeline and the styled renderer.
//!
//! [`AdjustmentSettings`] is a plain value object. It is replaced wholesale on
//! every change and read as a snapshot by each loop iteration, so nothing in
//! here is shared mutably.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

use crate::ascii::PaletteId;

/// Grid width range in characters.
pub const RESOLUTION_RANGE: RangeInclusive<u32> = 40..=500;
/// Contrast multiplier range.
pub const CONTRAST_RANGE: RangeInclusive<f64> = 0.5..=3.0;
/// Additive luma shift range.
pub const BRIGHTNESS_RANGE: RangeInclusive<i32> = -100..=100;
/// Gamma range.
pub const GAMMA_RANGE: RangeInclusive<f64> = 0.1..=3.0;
/// Grain amount range (fraction of full scale).
pub const NOISE_RANGE: RangeInclusive<f64> = 0.0..=1.0;
/// Glow radius range in nominal pixels.
pub const GLOW_RANGE: RangeInclusive<u32> = 0..=10;
/// Scanline overlay opacity range.
pub const SCANLINE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Font size range in pixels.
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 2..=20;

/// Colour treatment applied to the glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorMode {
    #[default]
    Green,
    Amber,
    Cyan,
    White,
    Red,
    Blue,
    Plasma,
    /// Multi-tone vertical green gradient.
    Matrix,
    /// Per-cell camera colour passthrough.
    TrueColor,
}

impl ColorMode {
    /// All colour modes in selector order.
    pub const ALL: [ColorMode; 9] = [
        ColorMode::Green,
        ColorMode::Amber,
        ColorMode::Cyan,
        ColorMode::White,
        ColorMode::Red,
        ColorMode::Blue,
        ColorMode::Plasma,
        ColorMode::Matrix,
        ColorMode::TrueColor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColorMode::Green => "green",
            ColorMode::Amber => "amber",
            ColorMode::Cyan => "cyan",
            ColorMode::White => "white",
            ColorMode::Red => "red",
            ColorMode::Blue => "blue",
            ColorMode::Plasma => "plasma",
            ColorMode::Matrix => "matrix",
            ColorMode::TrueColor => "truecolor",
        }
    }

    /// Parse a colour mode name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        let lower = lower.replace(['-', '_'], "");
        Self::ALL.into_iter().find(|mode| mode.name() == lower)
    }

    /// Whether the mode needs the per-cell sampled colours.
    pub fn is_true_color(&self) -> bool {
        matches!(self, ColorMode::TrueColor)
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The full set of user adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentSettings {
    pub palette: PaletteId,
    pub resolution_columns: u32,
    pub contrast: f64,
    pub brightness_offset: i32,
    pub gamma: f64,
    pub noise_amount: f64,
    pub inverted: bool,
    pub mirror_horizontal: bool,
    pub color_mode: ColorMode,
    pub glow_radius: u32,
    pub scanline_intensity: f32,
    pub font_size_px: u32,
}

impl Default for AdjustmentSettings {
    fn default() -> Self {
        Self {
            palette: PaletteId::Standard,
            resolution_columns: 120,
            contrast: 1.0,
            brightness_offset: 0,
            gamma: 1.0,
            noise_amount: 0.0,
            inverted: false,
            mirror_horizontal: true,
            color_mode: ColorMode::Green,
            glow_radius: 0,
            scanline_intensity: 0.3,
            font_size_px: 10,
        }
    }
}

/// Clamp a float into `range`; NaN becomes `fallback`.
fn clamp_float<T: PartialOrd + Copy>(value: T, range: &RangeInclusive<T>, fallback: T) -> T {
    match value.partial_cmp(range.start()) {
        None => fallback,
        Some(std::cmp::Ordering::Less) => *range.start(),
        _ if value > *range.end() => *range.end(),
        _ => value,
    }
}

impl AdjustmentSettings {
    /// Restore the documented default record.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Return a copy with every numeric field pulled into its range.
    ///
    /// NaN floats fall back to their default value.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        Self {
            palette: self.palette,
            resolution_columns: self
                .resolution_columns
                .clamp(*RESOLUTION_RANGE.start(), *RESOLUTION_RANGE.end()),
            contrast: clamp_float(self.contrast, &CONTRAST_RANGE, defaults.contrast),
            brightness_offset: self
                .brightness_offset
                .clamp(*BRIGHTNESS_RANGE.start(), *BRIGHTNESS_RANGE.end()),
            gamma: clamp_float(self.gamma, &GAMMA_RANGE, defaults.gamma),
            noise_amount: clamp_float(self.noise_amount, &NOISE_RANGE, defaults.noise_amount),
            inverted: self.inverted,
            mirror_horizontal: self.mirror_horizontal,
            color_mode: self.color_mode,
            glow_radius: self.glow_radius.clamp(*GLOW_RANGE.start(), *GLOW_RANGE.end()),
            scanline_intensity: clamp_float(
                self.scanline_intensity,
                &SCANLINE_RANGE,
                defaults.scanline_intensity,
            ),
            font_size_px: self
                .font_size_px
                .clamp(*FONT_SIZE_RANGE.start(), *FONT_SIZE_RANGE.end()),
        }
    }

    /// Whether every numeric field is inside its range.
    pub fn is_valid(&self) -> bool {
        *self == self.clamped()
    }

    pub fn set_resolution_columns(&mut self, columns: u32) {
        self.resolution_columns = columns;
        *self = self.clamped();
    }

    pub fn set_contrast(&mut self, contrast: f64) {
        self.contrast = contrast;
        *self = self.clamped();
    }

    pub fn set_brightness_offset(&mut self, offset: i32) {
        self.brightness_offset = offset;
        *self = self.clamped();
    }

    pub fn set_gamma(&mut self, gamma: f64) {
        self.gamma = gamma;
        *self = self.clamped();
    }

    pub fn set_noise_amount(&mut self, amount: f64) {
        self.noise_amount = amount;
        *self = self.clamped();
    }

    pub fn set_glow_radius(&mut self, radius: u32) {
        self.glow_radius = radius;
        *self = self.clamped();
    }

    pub fn set_scanline_intensity(&mut self, intensity: f32) {
        self.scanline_intensity = intensity;
        *self = self.clamped();
    }

    pub fn set_font_size_px(&mut self, size: u32) {
        self.font_size_px = size;
        *self = self.clamped();
    }

    /// Apply a partial update and clamp the result.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(palette) = patch.palette {
            self.palette = palette;
        }
        if let Some(columns) = patch.resolution_columns {
            self.resolution_columns = columns;
        }
        if let Some(contrast) = patch.contrast {
            self.contrast = contrast;
        }
        if let Some(offset) = patch.brightness_offset {
            self.brightness_offset = offset;
        }
        if let Some(gamma) = patch.gamma {
            self.gamma = gamma;
        }
        if let Some(noise) = patch.noise_amount {
            self.noise_amount = noise;
        }
        if let Some(inverted) = patch.inverted {
            self.inverted = inverted;
        }
        if let Some(mirror) = patch.mirror_horizontal {
            self.mirror_horizontal = mirror;
        }
        if let Some(mode) = patch.color_mode {
            self.color_mode = mode;
        }
        if let Some(glow) = patch.glow_radius {
            self.glow_radius = glow;
        }
        if let Some(scanlines) = patch.scanline_intensity {
            self.scanline_intensity = scanlines;
        }
        if let Some(size) = patch.font_size_px {
            self.font_size_px = size;
        }
        *self = self.clamped();
    }
}

/// A partial settings update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub palette: Option<PaletteId>,
    pub resolution_columns: Option<u32>,
    pub contrast: Option<f64>,
    pub brightness_offset: Option<i32>,
    pub gamma: Option<f64>,
    pub noise_amount: Option<f64>,
    pub inverted: Option<bool>,
    pub mirror_horizontal: Option<bool>,
    pub color_mode: Option<ColorMode>,
    pub glow_radius: Option<u32>,
    pub scanline_intensity: Option<f32>,
    pub font_size_px: Option<u32>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(&mut self, other: &SettingsPatch) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            palette,
            resolution_columns,
            contrast,
            brightness_offset,
            gamma,
            noise_amount,
            inverted,
            mirror_horizontal,
            color_mode,
            glow_radius,
            scanline_intensity,
            font_size_px
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_record() {
        let s = AdjustmentSettings::default();
        assert_eq!(s.palette, PaletteId::Standard);
        assert_eq!(s.resolution_columns, 120);
        assert_eq!(s.contrast, 1.0);
        assert_eq!(s.brightness_offset, 0);
        assert_eq!(s.gamma, 1.0);
        assert_eq!(s.noise_amount, 0.0);
        assert!(!s.inverted);
        assert!(s.mirror_horizontal);
        assert_eq!(s.color_mode, ColorMode::Green);
        assert_eq!(s.glow_radius, 0);
        assert_eq!(s.scanline_intensity, 0.3);
        assert_eq!(s.font_size_px, 10);
        assert!(s.is_valid());
    }

    #[test]
    fn test_reset_after_mutation_restores_defaults() {
        let mut s = AdjustmentSettings::default();
        s.palette = PaletteId::Runes;
        s.set_resolution_columns(333);
        s.set_contrast(2.5);
        s.set_brightness_offset(-40);
        s.set_gamma(0.4);
        s.set_noise_amount(0.7);
        s.inverted = true;
        s.mirror_horizontal = false;
        s.color_mode = ColorMode::TrueColor;
        s.set_glow_radius(7);
        s.set_scanline_intensity(0.9);
        s.set_font_size_px(18);
        assert_ne!(s, AdjustmentSettings::default());

        s.reset();
        assert_eq!(s, AdjustmentSettings::default());
    }

    #[test]
    fn test_setters_clamp_out_of_range() {
        let mut s = AdjustmentSettings::default();
        s.set_resolution_columns(10);
        assert_eq!(s.resolution_columns, 40);
        s.set_resolution_columns(9000);
        assert_eq!(s.resolution_columns, 500);
        s.set_contrast(0.0);
        assert_eq!(s.contrast, 0.5);
        s.set_brightness_offset(250);
        assert_eq!(s.brightness_offset, 100);
        s.set_gamma(-1.0);
        assert_eq!(s.gamma, 0.1);
        s.set_noise_amount(3.0);
        assert_eq!(s.noise_amount, 1.0);
        s.set_glow_radius(99);
        assert_eq!(s.glow_radius, 10);
        s.set_font_size_px(1);
        assert_eq!(s.font_size_px, 2);
        assert!(s.is_valid());
    }

    #[test]
    fn test_nan_falls_back_to_default() {
        let mut s = AdjustmentSettings::default();
        s.set_gamma(f64::NAN);
        assert_eq!(s.gamma, 1.0);
    }

    #[test]
    fn test_apply_patch_merges_and_clamps() {
        let mut s = AdjustmentSettings::default();
        let patch = SettingsPatch {
            contrast: Some(5.0),
            inverted: Some(true),
            ..Default::default()
        };
        s.apply(&patch);
        assert_eq!(s.contrast, 3.0);
        assert!(s.inverted);
        assert_eq!(s.resolution_columns, 120);
    }

    #[test]
    fn test_patch_merge_prefers_other() {
        let mut base = SettingsPatch {
            gamma: Some(2.0),
            glow_radius: Some(3),
            ..Default::default()
        };
        base.merge(&SettingsPatch {
            gamma: Some(0.5),
            ..Default::default()
        });
        assert_eq!(base.gamma, Some(0.5));
        assert_eq!(base.glow_radius, Some(3));
    }

    #[test]
    fn test_patch_json_uses_variant_names() {
        let patch = SettingsPatch {
            palette: Some(PaletteId::Matrix),
            color_mode: Some(ColorMode::TrueColor),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["palette"], "Matrix");
        assert_eq!(json["color_mode"], "TrueColor");

        let back: SettingsPatch =
            serde_json::from_str(r#"{"palette":"Matrix","color_mode":"TrueColor"}"#).unwrap();
        assert_eq!(back, patch);
    }

    #[test]
    fn test_color_mode_from_name() {
        assert_eq!(ColorMode::from_name("Amber"), Some(ColorMode::Amber));
        assert_eq!(ColorMode::from_name("true-color"), Some(ColorMode::TrueColor));
        assert_eq!(ColorMode::from_name("mauve"), None);
    }
}
