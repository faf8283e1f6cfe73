//! CLI enum types for palette, colour mode, source and share platform options.

use clap::ValueEnum;

use crate::ascii::PaletteId;
use crate::settings::ColorMode;
use crate::share::Platform;

/// Glyph palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaletteArg {
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

impl From<PaletteArg> for PaletteId {
    fn from(p: PaletteArg) -> Self {
        match p {
            PaletteArg::Standard => PaletteId::Standard,
            PaletteArg::Blocks => PaletteId::Blocks,
            PaletteArg::Binary => PaletteId::Binary,
            PaletteArg::Matrix => PaletteId::Matrix,
            PaletteArg::Gibberish => PaletteId::Gibberish,
            PaletteArg::Minimal => PaletteId::Minimal,
            PaletteArg::Shapes => PaletteId::Shapes,
            PaletteArg::Runes => PaletteId::Runes,
            PaletteArg::Cursive => PaletteId::Cursive,
        }
    }
}

/// Glyph colour treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorArg {
    Green,
    Amber,
    Cyan,
    White,
    Red,
    Blue,
    Plasma,
    Matrix,
    #[value(alias = "truecolor")]
    TrueColor,
}

impl From<ColorArg> for ColorMode {
    fn from(c: ColorArg) -> Self {
        match c {
            ColorArg::Green => ColorMode::Green,
            ColorArg::Amber => ColorMode::Amber,
            ColorArg::Cyan => ColorMode::Cyan,
            ColorArg::White => ColorMode::White,
            ColorArg::Red => ColorMode::Red,
            ColorArg::Blue => ColorMode::Blue,
            ColorArg::Plasma => ColorMode::Plasma,
            ColorArg::Matrix => ColorMode::Matrix,
            ColorArg::TrueColor => ColorMode::TrueColor,
        }
    }
}

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SourceKind {
    #[default]
    Camera,
    /// Animated synthetic gradient, no camera needed
    Pattern,
}

/// Share target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShareArg {
    Twitter,
    Whatsapp,
    Instagram,
}

impl From<ShareArg> for Platform {
    fn from(s: ShareArg) -> Self {
        match s {
            ShareArg::Twitter => Platform::Twitter,
            ShareArg::Whatsapp => Platform::WhatsApp,
            ShareArg::Instagram => Platform::Instagram,
        }
    }
}
