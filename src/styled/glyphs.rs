//! Glyph rasterization for the offscreen renderer.

use std::path::Path;

use fontdue::{Font, FontSettings};

/// Coverage bitmap for one character cell (0 = empty, 255 = full ink).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0; (width * height) as usize],
        }
    }

    pub fn is_blank(&self) -> bool {
        self.coverage.iter().all(|&c| c == 0)
    }

    /// Fraction of the cell covered, 0.0..=1.0.
    pub fn ink(&self) -> f32 {
        if self.coverage.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.coverage.iter().map(|&c| u64::from(c)).sum();
        sum as f32 / (self.coverage.len() as f32 * 255.0)
    }
}

/// Produces a cell-sized coverage mask for a glyph.
pub trait GlyphRasterizer: Send {
    /// Rasterize `ch` into a `cell_w` × `cell_h` mask at `font_px`.
    ///
    /// `density` is the glyph's position in the active palette (0.0
    /// darkest, 1.0 lightest); font-backed rasterizers ignore it.
    fn rasterize(
        &mut self,
        ch: char,
        density: f32,
        font_px: f32,
        cell_w: u32,
        cell_h: u32,
    ) -> GlyphMask;
}

/// Errors from loading a font.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("failed to read font file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font: {0}")]
    Parse(String),
}

/// Rasterizer backed by a TrueType/OpenType font.
pub struct FontRasterizer {
    font: Font,
}

impl std::fmt::Debug for FontRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRasterizer").finish_non_exhaustive()
    }
}

impl FontRasterizer {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FontError> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| FontError::Parse(e.to_string()))?;
        Ok(Self { font })
    }

    pub fn from_path(path: &Path) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(bytes)
    }
}

impl GlyphRasterizer for FontRasterizer {
    fn rasterize(
        &mut self,
        ch: char,
        _density: f32,
        font_px: f32,
        cell_w: u32,
        cell_h: u32,
    ) -> GlyphMask {
        let mut mask = GlyphMask::empty(cell_w, cell_h);
        let (metrics, bitmap) = self.font.rasterize(ch, font_px);
        if metrics.width == 0 || metrics.height == 0 {
            return mask;
        }
        let ascent = self
            .font
            .horizontal_line_metrics(font_px)
            .map(|m| m.ascent)
            .unwrap_or(font_px * 0.8);
        // ymin is the bitmap bottom's offset above the baseline
        let top = (ascent - (metrics.height as f32 + metrics.ymin as f32)).round() as i32;
        let left = metrics.xmin;

        for row in 0..metrics.height {
            let y = top + row as i32;
            if y < 0 || y >= cell_h as i32 {
                continue;
            }
            for col in 0..metrics.width {
                let x = left + col as i32;
                if x < 0 || x >= cell_w as i32 {
                    continue;
                }
                let value = bitmap[row * metrics.width + col];
                let idx = (y as u32 * cell_w + x as u32) as usize;
                mask.coverage[idx] = mask.coverage[idx].max(value);
            }
        }
        mask
    }
}

/// Font-free fallback: a centred block whose area is the glyph's density.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockRasterizer;

impl GlyphRasterizer for BlockRasterizer {
    fn rasterize(
        &mut self,
        _ch: char,
        density: f32,
        _font_px: f32,
        cell_w: u32,
        cell_h: u32,
    ) -> GlyphMask {
        let mut mask = GlyphMask::empty(cell_w, cell_h);
        let density = density.clamp(0.0, 1.0);
        if density <= 0.0 {
            return mask;
        }
        let side = density.sqrt();
        let w = ((cell_w as f32 * side).round() as u32).clamp(1, cell_w);
        let h = ((cell_h as f32 * side).round() as u32).clamp(1, cell_h);
        let x0 = (cell_w - w) / 2;
        let y0 = (cell_h - h) / 2;
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.coverage[(y * cell_w + x) as usize] = 255;
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_rasterizer_blank_for_darkest() {
        let mask = BlockRasterizer.rasterize(' ', 0.0, 20.0, 12, 20);
        assert!(mask.is_blank());
        assert_eq!(mask.coverage.len(), 240);
    }

    #[test]
    fn test_block_rasterizer_full_for_lightest() {
        let mask = BlockRasterizer.rasterize('B', 1.0, 20.0, 12, 20);
        assert_eq!(mask.ink(), 1.0);
    }

    #[test]
    fn test_block_rasterizer_ink_grows_with_density() {
        let low = BlockRasterizer.rasterize('.', 0.2, 20.0, 12, 20).ink();
        let high = BlockRasterizer.rasterize('#', 0.8, 20.0, 12, 20).ink();
        assert!(low > 0.0);
        assert!(high > low);
    }

    #[test]
    fn test_font_from_garbage_bytes_fails() {
        let result = FontRasterizer::from_bytes(vec![0, 1, 2, 3]);
        assert!(matches!(result, Err(FontError::Parse(_))));
    }

    #[test]
    fn test_font_from_missing_path_fails() {
        let result = FontRasterizer::from_path(Path::new("/definitely/not/here.ttf"));
        assert!(matches!(result, Err(FontError::Read { .. })));
    }
}
