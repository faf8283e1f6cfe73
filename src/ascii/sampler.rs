//! Frame sampling: reduce a camera frame to the character grid.

use crate::source::Frame;

/// Row compensation for glyphs being taller than wide. Calibrated visually
/// for monospace fonts; not derived from font metrics.
pub const ROW_ASPECT_FACTOR: f64 = 0.55;

/// Number of grid rows for a `columns`-wide grid over a `src_width` ×
/// `src_height` source: `floor(columns × (h / w) × 0.55)`.
pub fn computed_rows(columns: u32, src_width: u32, src_height: u32) -> u32 {
    if src_width == 0 || src_height == 0 {
        return 0;
    }
    let aspect = src_height as f64 / src_width as f64;
    (columns as f64 * aspect * ROW_ASPECT_FACTOR).floor() as u32
}

/// One averaged RGB sample per grid cell, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub columns: u32,
    pub rows: u32,
    /// RGB triples, `columns * rows * 3` bytes.
    pub data: Vec<u8>,
}

impl FrameBuffer {
    #[inline]
    pub fn sample(&self, col: u32, row: u32) -> [u8; 3] {
        let idx = ((row * self.columns + col) * 3) as usize;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn len(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sample `frame` into a `columns` × `computed_rows` grid.
///
/// Each cell is the average of the source pixels it covers. With `mirror`
/// the horizontal axis is flipped, so column 0 reads the right edge.
///
/// Returns `None` when the frame is not usable yet (no pixels, truncated
/// data, or a grid with zero rows). That is "not ready", not an error.
pub fn sample(frame: &Frame, columns: u32, mirror: bool) -> Option<FrameBuffer> {
    let mut buffer = FrameBuffer {
        columns: 0,
        rows: 0,
        data: Vec::new(),
    };
    sample_into(frame, columns, mirror, &mut buffer).then_some(buffer)
}

/// Allocation-reusing form of [`sample`]. Returns false when not ready.
pub fn sample_into(frame: &Frame, columns: u32, mirror: bool, buffer: &mut FrameBuffer) -> bool {
    if columns == 0 || !frame.is_complete() {
        return false;
    }
    let rows = computed_rows(columns, frame.width, frame.height);
    if rows == 0 {
        return false;
    }

    buffer.columns = columns;
    buffer.rows = rows;
    buffer.data.clear();
    buffer.data.reserve((columns * rows * 3) as usize);

    let cell_w = frame.width as f32 / columns as f32;
    let cell_h = frame.height as f32 / rows as f32;

    for cy in 0..rows {
        // Every cell covers at least one source pixel, even when upsampling
        let start_y = ((cy as f32 * cell_h) as u32).min(frame.height - 1);
        let end_y = (((cy + 1) as f32 * cell_h) as u32)
            .max(start_y + 1)
            .min(frame.height);
        for cx in 0..columns {
            let src_col = if mirror { columns - 1 - cx } else { cx };
            let start_x = ((src_col as f32 * cell_w) as u32).min(frame.width - 1);
            let end_x = (((src_col + 1) as f32 * cell_w) as u32)
                .max(start_x + 1)
                .min(frame.width);

            let mut sum = [0u32; 3];
            let mut count = 0u32;
            for py in start_y..end_y {
                for px in start_x..end_x {
                    let [r, g, b] = frame.pixel(px, py);
                    sum[0] += r as u32;
                    sum[1] += g as u32;
                    sum[2] += b as u32;
                    count += 1;
                }
            }
            let count = count.max(1);
            buffer.data.push((sum[0] / count) as u8);
            buffer.data.push((sum[1] / count) as u8);
            buffer.data.push((sum[2] / count) as u8);
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _y in 0..height {
            for x in 0..width {
                let v = ((x as f32 / width as f32) * 255.0) as u8;
                data.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(data, width, height)
    }

    #[test]
    fn test_computed_rows_4_3() {
        // 120 * 0.75 * 0.55 = 49.5
        assert_eq!(computed_rows(120, 640, 480), 49);
        assert_eq!(computed_rows(40, 640, 480), 16);
        assert_eq!(computed_rows(500, 640, 480), 206);
    }

    #[test]
    fn test_computed_rows_zero_source() {
        assert_eq!(computed_rows(120, 0, 480), 0);
        assert_eq!(computed_rows(120, 640, 0), 0);
    }

    #[test]
    fn test_sample_dimensions() {
        let frame = gradient(640, 480);
        let buf = sample(&frame, 80, false).unwrap();
        assert_eq!(buf.columns, 80);
        assert_eq!(buf.rows, 33);
        assert_eq!(buf.data.len(), 80 * 33 * 3);
    }

    #[test]
    fn test_sample_mirror_flips_columns() {
        let frame = gradient(64, 64);
        let plain = sample(&frame, 40, false).unwrap();
        let mirrored = sample(&frame, 40, true).unwrap();
        for col in 0..40 {
            assert_eq!(plain.sample(col, 0), mirrored.sample(39 - col, 0));
        }
        assert!(plain.sample(0, 0)[0] < plain.sample(39, 0)[0]);
        assert!(mirrored.sample(0, 0)[0] > mirrored.sample(39, 0)[0]);
    }

    #[test]
    fn test_sample_not_ready() {
        assert!(sample(&Frame::new(Vec::new(), 0, 0), 40, false).is_none());
        assert!(sample(&Frame::new(vec![0; 10], 640, 480), 40, false).is_none());
        // 40 columns over a 1000x1 strip computes zero rows
        assert!(sample(&Frame::solid(1000, 1, [9, 9, 9]), 40, false).is_none());
    }

    #[test]
    fn test_sample_upsamples_small_sources() {
        let frame = Frame::solid(8, 8, [200, 100, 50]);
        let buf = sample(&frame, 40, false).unwrap();
        assert_eq!(buf.rows, 22);
        assert!(buf.data.chunks(3).all(|c| c == [200, 100, 50]));
    }
}
