//! Synthetic animated source for running without a camera.

use std::sync::Arc;
use std::time::Instant;

use super::types::{Frame, VideoSource};

/// A drifting radial gradient with colour bands.
///
/// Frames are generated on demand from the elapsed time, so the source is
/// always ready.
#[derive(Debug, Clone)]
pub struct TestPattern {
    width: u32,
    height: u32,
    started: Instant,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            started: Instant::now(),
        }
    }

    /// Render the pattern at `t` seconds.
    pub fn render_at(&self, t: f32) -> Frame {
        let (w, h) = (self.width as f32, self.height as f32);
        let cx = w * (0.5 + 0.25 * (t * 0.7).sin());
        let cy = h * (0.5 + 0.2 * (t * 0.9).cos());
        let max_dist = (w * w + h * h).sqrt() * 0.6;

        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                let v = (1.0 - dist / max_dist).clamp(0.0, 1.0);
                let band = ((x as f32 / w + t * 0.1).fract() * 3.0) as u8;
                let base = (v * 255.0) as u8;
                let rgb = match band {
                    0 => [base, base / 2, base / 3],
                    1 => [base / 3, base, base / 2],
                    _ => [base / 2, base / 3, base],
                };
                data.extend_from_slice(&rgb);
            }
        }
        Frame::new(data, self.width, self.height)
    }
}

impl VideoSource for TestPattern {
    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }

    fn latest_frame(&self) -> Option<Arc<Frame>> {
        Some(Arc::new(self.render_at(self.started.elapsed().as_secs_f32())))
    }
}
