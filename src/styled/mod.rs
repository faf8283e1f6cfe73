//! Offscreen styled renderer.
//!
//! Draws an [`AsciiFrame`] onto an RGBA surface using the current colour
//! mode and glow settings. The surface is what still captures, video
//! recording and loop frames read from, so it is rendered at twice the
//! nominal font size.

mod glyphs;
mod tint;

use std::collections::HashMap;

use crate::ascii::{AsciiFrame, CellColor, GlyphPalette, PaletteId};
use crate::settings::{AdjustmentSettings, ColorMode};

pub use glyphs::{BlockRasterizer, FontError, FontRasterizer, GlyphMask, GlyphRasterizer};
pub use tint::{glow_color, matrix_gradient, tint, GLOW_ALPHA};

/// Render scale relative to the on-screen font size.
pub const SUPERSAMPLE: f32 = 2.0;
/// Monospace advance width as a fraction of the font size.
pub const CHAR_WIDTH_FACTOR: f32 = 0.601;
/// Box-blur passes used to approximate a gaussian glow.
const GLOW_PASSES: usize = 3;

/// RGBA8 pixel surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        let mut surface = Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        };
        surface.clear();
        surface
    }

    /// Fill with opaque black.
    pub fn clear(&mut self) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[0, 0, 0, 255]);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn blend(&mut self, x: u32, y: u32, color: CellColor, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let a = alpha.min(1.0);
        let i = ((y * self.width + x) * 4) as usize;
        let mix = |dst: u8, src: u8| (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8;
        self.pixels[i] = mix(self.pixels[i], color.r);
        self.pixels[i + 1] = mix(self.pixels[i + 1], color.g);
        self.pixels[i + 2] = mix(self.pixels[i + 2], color.b);
    }
}

/// Cell size in surface pixels for a nominal font size.
pub fn cell_size(font_size_px: u32) -> (f32, f32) {
    let font = font_size_px as f32 * SUPERSAMPLE;
    (font * CHAR_WIDTH_FACTOR, font)
}

/// Surface dimensions for a grid.
pub fn surface_size(columns: u32, rows: u32, font_size_px: u32) -> (u32, u32) {
    let (cw, ch) = cell_size(font_size_px);
    (
        (columns as f32 * cw).ceil() as u32,
        (rows as f32 * ch).ceil() as u32,
    )
}

type MaskKey = (char, u32, u32);

/// Renders glyph grids onto a reusable surface.
pub struct StyledCanvas {
    rasterizer: Box<dyn GlyphRasterizer>,
    surface: Surface,
    reallocations: u64,
    masks: HashMap<MaskKey, GlyphMask>,
    palette: GlyphPalette,
    coverage: Vec<f32>,
}

impl std::fmt::Debug for StyledCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyledCanvas")
            .field("width", &self.surface.width)
            .field("height", &self.surface.height)
            .field("reallocations", &self.reallocations)
            .finish_non_exhaustive()
    }
}

impl Default for StyledCanvas {
    fn default() -> Self {
        Self::new(Box::new(BlockRasterizer))
    }
}

impl StyledCanvas {
    pub fn new(rasterizer: Box<dyn GlyphRasterizer>) -> Self {
        Self {
            rasterizer,
            surface: Surface::new(0, 0),
            reallocations: 0,
            masks: HashMap::new(),
            palette: PaletteId::Standard.palette(),
            coverage: Vec::new(),
        }
    }

    /// Canvas using the font at `path`, or block glyphs if it can't be loaded.
    pub fn with_font_or_blocks(path: Option<&std::path::Path>) -> Self {
        match path.map(FontRasterizer::from_path) {
            Some(Ok(font)) => Self::new(Box::new(font)),
            Some(Err(e)) => {
                log::warn!("Falling back to block glyphs: {}", e);
                Self::default()
            }
            None => Self::default(),
        }
    }

    /// Number of times the backing surface has been resized.
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Draw `frame` with `settings` and return the updated surface.
    pub fn render(&mut self, frame: &AsciiFrame, settings: &AdjustmentSettings) -> &Surface {
        let settings = settings.clamped();
        let (width, height) = surface_size(frame.columns, frame.rows, settings.font_size_px);
        if width != self.surface.width || height != self.surface.height {
            self.surface = Surface::new(width, height);
            self.coverage = vec![0.0; (width as usize) * (height as usize)];
            self.masks.clear();
            self.reallocations += 1;
            log::debug!("Styled surface resized to {}x{}", width, height);
        } else {
            self.surface.clear();
            self.coverage.iter_mut().for_each(|c| *c = 0.0);
        }
        if self.surface.is_empty() {
            return &self.surface;
        }
        if self.palette.name() != settings.palette.name() {
            self.palette = settings.palette.palette();
        }

        let (cell_w, cell_h) = cell_size(settings.font_size_px);
        let mask_w = cell_w.ceil() as u32;
        let mask_h = cell_h.ceil() as u32;
        let font_px = cell_h;

        for (row, line) in frame.lines().enumerate() {
            let y0 = (row as f32 * cell_h).floor() as u32;
            let tint_color = self.row_tint(settings.color_mode, row as u32, frame.rows);
            for (col, ch) in line.chars().enumerate() {
                let density = self.palette.density(ch).unwrap_or(1.0);
                let key = (ch, mask_w, mask_h);
                if !self.masks.contains_key(&key) {
                    let mask = self.rasterizer.rasterize(ch, density, font_px, mask_w, mask_h);
                    self.masks.insert(key, mask);
                }
                let Some(mask) = self.masks.get(&key) else {
                    continue;
                };
                if mask.is_blank() {
                    continue;
                }
                let x0 = (col as f32 * cell_w).floor() as u32;
                let color = if settings.color_mode.is_true_color() {
                    frame
                        .color_at(col as u32, row as u32)
                        .unwrap_or(tint_color)
                } else {
                    tint_color
                };
                draw_mask(&mut self.surface, &mut self.coverage, mask, x0, y0, color);
            }
        }

        if settings.glow_radius > 0 {
            if let Some(glow) = glow_color(settings.color_mode) {
                self.apply_glow(glow, settings.glow_radius);
            }
        }
        &self.surface
    }

    fn row_tint(&self, mode: ColorMode, row: u32, rows: u32) -> CellColor {
        if mode == ColorMode::Matrix {
            let t = if rows > 1 {
                row as f32 / (rows - 1) as f32
            } else {
                0.0
            };
            matrix_gradient(t)
        } else {
            tint(mode)
        }
    }

    /// Blur the glyph coverage and composite it under-and-over the text as a
    /// translucent halo.
    fn apply_glow(&mut self, color: CellColor, glow_radius: u32) {
        let (w, h) = (self.surface.width as usize, self.surface.height as usize);
        let radius = (glow_radius as f32 * SUPERSAMPLE / 2.0).round().max(1.0) as usize;
        let mut halo = self.coverage.clone();
        let mut scratch = vec![0.0f32; halo.len()];
        for _ in 0..GLOW_PASSES {
            box_blur_horizontal(&halo, &mut scratch, w, h, radius);
            box_blur_vertical(&scratch, &mut halo, w, h, radius);
        }
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let extra = halo[i] - self.coverage[i];
                if extra > 0.0 {
                    self.surface
                        .blend(x as u32, y as u32, color, extra * GLOW_ALPHA);
                }
            }
        }
    }
}

fn draw_mask(
    surface: &mut Surface,
    coverage: &mut [f32],
    mask: &GlyphMask,
    x0: u32,
    y0: u32,
    color: CellColor,
) {
    for my in 0..mask.height {
        let y = y0 + my;
        if y >= surface.height {
            break;
        }
        for mx in 0..mask.width {
            let x = x0 + mx;
            if x >= surface.width {
                break;
            }
            let value = mask.coverage[(my * mask.width + mx) as usize];
            if value == 0 {
                continue;
            }
            let alpha = value as f32 / 255.0;
            surface.blend(x, y, color, alpha);
            let i = (y * surface.width + x) as usize;
            coverage[i] = coverage[i].max(alpha);
        }
    }
}

fn box_blur_horizontal(src: &[f32], dst: &mut [f32], w: usize, h: usize, r: usize) {
    let window = (2 * r + 1) as f32;
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        let mut sum: f32 = row[..(r + 1).min(w)].iter().sum();
        for x in 0..w {
            dst[y * w + x] = sum / window;
            if x + r + 1 < w {
                sum += row[x + r + 1];
            }
            if x >= r {
                sum -= row[x - r];
            }
        }
    }
}

fn box_blur_vertical(src: &[f32], dst: &mut [f32], w: usize, h: usize, r: usize) {
    let window = (2 * r + 1) as f32;
    for x in 0..w {
        let mut sum: f32 = (0..(r + 1).min(h)).map(|y| src[y * w + x]).sum();
        for y in 0..h {
            dst[y * w + x] = sum / window;
            if y + r + 1 < h {
                sum += src[(y + r + 1) * w + x];
            }
            if y >= r {
                sum -= src[(y - r) * w + x];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(text_rows: &[&str]) -> AsciiFrame {
        let columns = text_rows[0].chars().count() as u32;
        let glyphs: Vec<char> = text_rows.iter().flat_map(|r| r.chars()).collect();
        AsciiFrame::from_glyphs(&glyphs, columns, text_rows.len() as u32)
    }

    fn settings(mode: ColorMode, glow: u32) -> AdjustmentSettings {
        AdjustmentSettings {
            color_mode: mode,
            glow_radius: glow,
            font_size_px: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_surface_size_uses_supersampled_cells() {
        // 10px font: 12.02 x 20 cells
        assert_eq!(surface_size(40, 10, 10), (481, 200));
        assert_eq!(surface_size(1, 1, 2), (3, 4));
    }

    #[test]
    fn test_blank_frame_renders_black() {
        let mut canvas = StyledCanvas::default();
        let surface = canvas.render(&frame_of(&["  ", "  "]), &settings(ColorMode::Green, 0));
        assert!(surface.pixels.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
    }

    #[test]
    fn test_full_glyph_takes_tint() {
        let mut canvas = StyledCanvas::default();
        let surface = canvas.render(&frame_of(&["B"]), &settings(ColorMode::Amber, 0));
        let (w, h) = (surface.width, surface.height);
        assert_eq!(surface.pixel(w / 2, h / 2), [245, 158, 11, 255]);
    }

    #[test]
    fn test_true_color_uses_cell_colors() {
        let mut canvas = StyledCanvas::default();
        let frame = frame_of(&["BB"]).with_colors(vec![
            CellColor::new(200, 10, 10),
            CellColor::new(10, 10, 200),
        ]);
        let surface = canvas.render(&frame, &settings(ColorMode::TrueColor, 4));
        let (cw, ch) = cell_size(10);
        let left = surface.pixel((cw / 2.0) as u32, (ch / 2.0) as u32);
        let right = surface.pixel((cw * 1.5) as u32, (ch / 2.0) as u32);
        assert_eq!(left, [200, 10, 10, 255]);
        assert_eq!(right, [10, 10, 200, 255]);
    }

    #[test]
    fn test_glow_lights_neighbouring_blank_cells() {
        let frame = frame_of(&["  B  "]);
        let (cw, ch) = cell_size(10);
        let probe = ((cw * 1.9) as u32, (ch / 2.0) as u32);

        let mut plain = StyledCanvas::default();
        let dark = plain.render(&frame, &settings(ColorMode::Green, 0)).pixel(probe.0, probe.1);
        assert_eq!(dark, [0, 0, 0, 255]);

        let mut glowing = StyledCanvas::default();
        let lit = glowing
            .render(&frame, &settings(ColorMode::Green, 6))
            .pixel(probe.0, probe.1);
        assert!(lit[1] > 0);
    }

    #[test]
    fn test_glow_disabled_in_true_color() {
        let frame = frame_of(&["  B  "]).with_colors(vec![CellColor::new(255, 255, 255); 5]);
        let (cw, ch) = cell_size(10);
        let mut canvas = StyledCanvas::default();
        let surface = canvas.render(&frame, &settings(ColorMode::TrueColor, 10));
        assert_eq!(
            surface.pixel((cw * 1.9) as u32, (ch / 2.0) as u32),
            [0, 0, 0, 255]
        );
    }

    #[test]
    fn test_surface_reallocated_only_on_dimension_change() {
        let mut canvas = StyledCanvas::default();
        let s = settings(ColorMode::Green, 0);
        canvas.render(&frame_of(&["ab", "cd"]), &s);
        canvas.render(&frame_of(&["@@", "::"]), &s);
        assert_eq!(canvas.reallocations(), 1);
        canvas.render(&frame_of(&["abc"]), &s);
        assert_eq!(canvas.reallocations(), 2);
        canvas.render(
            &frame_of(&["abc"]),
            &AdjustmentSettings {
                font_size_px: 12,
                ..s
            },
        );
        assert_eq!(canvas.reallocations(), 3);
    }

    #[test]
    fn test_matrix_rows_follow_gradient() {
        let mut canvas = StyledCanvas::default();
        let frame = frame_of(&["B", "B", "B"]);
        let surface = canvas.render(&frame, &settings(ColorMode::Matrix, 0));
        let (cw, ch) = cell_size(10);
        let x = (cw / 2.0) as u32;
        let top = surface.pixel(x, (ch / 2.0) as u32);
        let bottom = surface.pixel(x, (ch * 2.5) as u32);
        assert_eq!(&top[..3], &[134, 239, 172]);
        assert_eq!(&bottom[..3], &[20, 83, 45]);
    }
}
