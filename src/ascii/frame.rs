//! The glyph grid produced once per tick.

use std::time::Instant;

/// RGB color for a character cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl CellColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// One tick's worth of glyphs.
///
/// `text` holds `rows` lines of exactly `columns` glyphs, each terminated
/// by `'\n'`. In true-colour mode `colors` carries the sampled colour of
/// every cell in row-major order.
#[derive(Debug, Clone)]
pub struct AsciiFrame {
    pub text: String,
    pub columns: u32,
    pub rows: u32,
    pub colors: Option<Vec<CellColor>>,
    pub produced_at: Instant,
}

impl AsciiFrame {
    /// Assemble a frame from row-major glyphs.
    ///
    /// `glyphs.len()` must equal `columns * rows`; extra glyphs are ignored.
    pub fn from_glyphs(glyphs: &[char], columns: u32, rows: u32) -> Self {
        let mut text = String::with_capacity(glyphs.len() * 2 + rows as usize);
        if columns > 0 {
            for row in glyphs.chunks(columns as usize).take(rows as usize) {
                text.extend(row.iter());
                text.push('\n');
            }
        }
        Self {
            text,
            columns,
            rows,
            colors: None,
            produced_at: Instant::now(),
        }
    }

    pub fn with_colors(mut self, colors: Vec<CellColor>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Rows without their terminators.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    /// Colour of the cell at (col, row), if colours are present.
    pub fn color_at(&self, col: u32, row: u32) -> Option<CellColor> {
        let colors = self.colors.as_ref()?;
        colors.get((row * self.columns + col) as usize).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_glyphs_terminates_rows() {
        let frame = AsciiFrame::from_glyphs(&['a', 'b', 'c', 'd', 'e', 'f'], 3, 2);
        assert_eq!(frame.text, "abc\ndef\n");
        assert_eq!(frame.lines().collect::<Vec<_>>(), vec!["abc", "def"]);
    }

    #[test]
    fn test_multibyte_rows_count_chars() {
        let frame = AsciiFrame::from_glyphs(&['░', '▒', '▓', '█'], 2, 2);
        for line in frame.lines() {
            assert_eq!(line.chars().count(), 2);
        }
    }

    #[test]
    fn test_color_at() {
        let frame = AsciiFrame::from_glyphs(&['a', 'b'], 2, 1)
            .with_colors(vec![CellColor::new(1, 2, 3), CellColor::new(4, 5, 6)]);
        assert_eq!(frame.color_at(1, 0), Some(CellColor::new(4, 5, 6)));
        assert_eq!(frame.color_at(5, 5), None);
    }
}
