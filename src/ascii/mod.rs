//! Frame-to-glyph conversion.
//!
//! This module provides the per-frame pipeline:
//!
//! 1. **Sampling** - area-average the camera frame into the character grid
//! 2. **Tone mapping** - grain, contrast, brightness, gamma and inversion
//! 3. **Glyph mapping** - bucket the tone-mapped luma into a palette
//!
//! # Palettes
//!
//! Nine built-in palettes are available via [`PaletteId`], from the
//! 12-level `Standard` ramp to `Runes` and katakana `Matrix` rain.

mod frame;
mod palette;
mod sampler;
mod tone;

pub use frame::{AsciiFrame, CellColor};
pub use palette::{
    GlyphPalette, PaletteError, PaletteId, BINARY_GLYPHS, BLOCKS_GLYPHS, CURSIVE_GLYPHS,
    GIBBERISH_GLYPHS, MATRIX_GLYPHS, MINIMAL_GLYPHS, RUNES_GLYPHS, SHAPES_GLYPHS, STANDARD_GLYPHS,
};
pub use sampler::{computed_rows, sample, sample_into, FrameBuffer, ROW_ASPECT_FACTOR};
pub use tone::{
    bucket_index, glyph_index, luma, map_pixel, tone_map, FixedNoise, NoiseSource, SeededNoise,
    ThreadNoise, BUCKET_DIVISOR,
};
