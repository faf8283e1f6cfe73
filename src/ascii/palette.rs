//! Glyph palette definitions.
//!
//! Every palette is ordered from darkest (index 0) to lightest. On a dark
//! display the leading space is "off" and the last glyph is the densest.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard density ramp (12 levels).
pub const STANDARD_GLYPHS: &str = " .:-=+*#%@MB";

/// Unicode shade blocks (5 levels).
pub const BLOCKS_GLYPHS: &str = " ░▒▓█";

/// Two-symbol binary look.
pub const BINARY_GLYPHS: &str = " 01";

/// Half-width katakana rain with digits and punctuation.
pub const MATRIX_GLYPHS: &str =
    " ﾊﾐﾋｰｳｼﾅﾓﾆｻﾜﾂｵﾘｱﾎﾃﾏｹﾒｴｶｷﾑﾕﾗｾﾈｽﾀﾇﾍｦｲｸｺ012345789Z:.\"*- ";

/// Latin-1 and math symbols.
pub const GIBBERISH_GLYPHS: &str = " §±£¢¬µ¶°¹³²€Þßðøæåœ∑∆∫Ω√ƒ∂å≈≠≤≥÷◊";

/// Clean three-level look.
pub const MINIMAL_GLYPHS: &str = " .*";

/// Geometric shapes.
pub const SHAPES_GLYPHS: &str = " ○◔◑◕●□▪■▲▼";

/// Elder futhark.
pub const RUNES_GLYPHS: &str = " ᚠᚢᚦᚨᚱᚲᚺᚾᛁᛃᛈᛉᛊᛏᛒᛖᛗᛚᛜᛞᛟ";

/// Cursive letterforms.
pub const CURSIVE_GLYPHS: &str = " ℓєℯ∂ωηℴℓ";

/// Errors from building a custom palette.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaletteError {
    #[error("palette needs at least 2 glyphs, got {0}")]
    TooShort(usize),
}

/// An ordered glyph sequence, darkest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphPalette {
    name: String,
    glyphs: Vec<char>,
}

impl GlyphPalette {
    /// Build a palette from a glyph string.
    ///
    /// # Errors
    /// Returns [`PaletteError::TooShort`] for fewer than two glyphs, since
    /// the mapping would collapse every luma value onto one character.
    pub fn new(name: impl Into<String>, glyphs: &str) -> Result<Self, PaletteError> {
        let glyphs: Vec<char> = glyphs.chars().collect();
        if glyphs.len() < 2 {
            return Err(PaletteError::TooShort(glyphs.len()));
        }
        Ok(Self {
            name: name.into(),
            glyphs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false; construction rejects short palettes.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Glyph at `index`, clamped to the last glyph.
    pub fn glyph(&self, index: usize) -> char {
        self.glyphs[index.min(self.glyphs.len() - 1)]
    }

    pub fn darkest(&self) -> char {
        self.glyphs[0]
    }

    pub fn lightest(&self) -> char {
        self.glyphs[self.glyphs.len() - 1]
    }

    /// Relative ink density of `ch` in this palette, 0.0 for the darkest
    /// glyph and 1.0 for the lightest. Uses the first occurrence.
    pub fn density(&self, ch: char) -> Option<f32> {
        let idx = self.glyphs.iter().position(|&g| g == ch)?;
        Some(idx as f32 / (self.glyphs.len() - 1) as f32)
    }
}

/// Identifier of a built-in palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaletteId {
    #[default]
    Standard,
    Blocks,
    Binary,
    Matrix,
    Gibberish,
    Minimal,
    Shapes,
    Runes,
    Cursive,
}

impl PaletteId {
    /// All built-in palettes in selector order.
    pub const ALL: [PaletteId; 9] = [
        PaletteId::Standard,
        PaletteId::Blocks,
        PaletteId::Binary,
        PaletteId::Matrix,
        PaletteId::Gibberish,
        PaletteId::Minimal,
        PaletteId::Shapes,
        PaletteId::Runes,
        PaletteId::Cursive,
    ];

    /// Glyph string of this palette.
    pub fn glyphs(&self) -> &'static str {
        match self {
            PaletteId::Standard => STANDARD_GLYPHS,
            PaletteId::Blocks => BLOCKS_GLYPHS,
            PaletteId::Binary => BINARY_GLYPHS,
            PaletteId::Matrix => MATRIX_GLYPHS,
            PaletteId::Gibberish => GIBBERISH_GLYPHS,
            PaletteId::Minimal => MINIMAL_GLYPHS,
            PaletteId::Shapes => SHAPES_GLYPHS,
            PaletteId::Runes => RUNES_GLYPHS,
            PaletteId::Cursive => CURSIVE_GLYPHS,
        }
    }

    /// Build the palette. The built-in table only holds valid palettes.
    pub fn palette(&self) -> GlyphPalette {
        GlyphPalette {
            name: self.name().to_string(),
            glyphs: self.glyphs().chars().collect(),
        }
    }

    /// Cycle to the next palette, wrapping around.
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|p| p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaletteId::Standard => "standard",
            PaletteId::Blocks => "blocks",
            PaletteId::Binary => "binary",
            PaletteId::Matrix => "matrix",
            PaletteId::Gibberish => "gibberish",
            PaletteId::Minimal => "minimal",
            PaletteId::Shapes => "shapes",
            PaletteId::Runes => "runes",
            PaletteId::Cursive => "cursive",
        }
    }

    /// Parse a palette name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|p| p.name() == lower)
    }
}

impl fmt::Display for PaletteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtin_palettes_have_at_least_two_glyphs() {
        for id in PaletteId::ALL {
            let palette = id.palette();
            assert!(palette.len() >= 2, "{} is too short", id);
            assert_eq!(palette.darkest(), ' ', "{} should start dark", id);
        }
    }

    #[test]
    fn test_standard_palette_is_twelve_levels() {
        let palette = PaletteId::Standard.palette();
        assert_eq!(palette.len(), 12);
        assert_eq!(palette.lightest(), 'B');
    }

    #[test]
    fn test_new_rejects_short_palettes() {
        assert_eq!(GlyphPalette::new("x", "#"), Err(PaletteError::TooShort(1)));
        assert_eq!(GlyphPalette::new("x", ""), Err(PaletteError::TooShort(0)));
        assert!(GlyphPalette::new("x", " #").is_ok());
    }

    #[test]
    fn test_palette_counts_chars_not_bytes() {
        let palette = PaletteId::Blocks.palette();
        assert_eq!(palette.len(), 5);
        assert_eq!(palette.lightest(), '█');
    }

    #[test]
    fn test_next_cycles_through_all() {
        let mut id = PaletteId::Standard;
        for _ in 0..PaletteId::ALL.len() {
            id = id.next();
        }
        assert_eq!(id, PaletteId::Standard);
        assert_eq!(PaletteId::Cursive.next(), PaletteId::Standard);
    }

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(PaletteId::from_name("RUNES"), Some(PaletteId::Runes));
        assert_eq!(PaletteId::from_name(" blocks "), Some(PaletteId::Blocks));
        assert_eq!(PaletteId::from_name("braille"), None);
    }

    #[test]
    fn test_density() {
        let palette = PaletteId::Minimal.palette();
        assert_eq!(palette.density(' '), Some(0.0));
        assert_eq!(palette.density('.'), Some(0.5));
        assert_eq!(palette.density('*'), Some(1.0));
        assert_eq!(palette.density('x'), None);
    }
}
