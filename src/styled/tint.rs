//! Colour tables for each [`ColorMode`].

use crate::ascii::CellColor;
use crate::settings::ColorMode;

/// Matrix gradient stops: top, middle, bottom.
pub const MATRIX_TOP: CellColor = CellColor::new(134, 239, 172);
pub const MATRIX_MID: CellColor = CellColor::new(34, 197, 94);
pub const MATRIX_BOTTOM: CellColor = CellColor::new(20, 83, 45);

/// Glow opacity.
pub const GLOW_ALPHA: f32 = 0.5;

/// Solid glyph colour of a monochrome mode.
///
/// `Matrix` returns its middle stop and `TrueColor` returns white (the
/// glyph acts as a mask over the sampled colour).
pub fn tint(mode: ColorMode) -> CellColor {
    match mode {
        ColorMode::Green => CellColor::new(34, 197, 94),
        ColorMode::Amber => CellColor::new(245, 158, 11),
        ColorMode::Cyan => CellColor::new(34, 211, 238),
        ColorMode::White => CellColor::new(229, 231, 235),
        ColorMode::Red => CellColor::new(239, 68, 68),
        ColorMode::Blue => CellColor::new(59, 130, 246),
        ColorMode::Plasma => CellColor::new(217, 70, 239),
        ColorMode::Matrix => MATRIX_MID,
        ColorMode::TrueColor => CellColor::new(255, 255, 255),
    }
}

/// Glow colour, or `None` when glow is disabled for the mode.
pub fn glow_color(mode: ColorMode) -> Option<CellColor> {
    match mode {
        ColorMode::TrueColor => None,
        ColorMode::White | ColorMode::Matrix => Some(CellColor::new(255, 255, 255)),
        other => Some(tint(other)),
    }
}

fn lerp(a: CellColor, b: CellColor, t: f32) -> CellColor {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    CellColor::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
}

/// Matrix gradient colour at vertical position `t` (0 top, 1 bottom).
pub fn matrix_gradient(t: f32) -> CellColor {
    let t = t.clamp(0.0, 1.0);
    if t <= 0.5 {
        lerp(MATRIX_TOP, MATRIX_MID, t * 2.0)
    } else {
        lerp(MATRIX_MID, MATRIX_BOTTOM, (t - 0.5) * 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glow_disabled_for_true_color() {
        assert_eq!(glow_color(ColorMode::TrueColor), None);
        assert_eq!(glow_color(ColorMode::Amber), Some(tint(ColorMode::Amber)));
        assert_eq!(glow_color(ColorMode::Matrix), Some(CellColor::new(255, 255, 255)));
    }

    #[test]
    fn test_matrix_gradient_stops() {
        assert_eq!(matrix_gradient(0.0), MATRIX_TOP);
        assert_eq!(matrix_gradient(0.5), MATRIX_MID);
        assert_eq!(matrix_gradient(1.0), MATRIX_BOTTOM);
        assert_eq!(matrix_gradient(7.0), MATRIX_BOTTOM);
    }
}
