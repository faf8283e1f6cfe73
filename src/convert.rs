//! The conversion loop: camera frame in, [`AsciiFrame`] out, once per tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::ascii::{self, AsciiFrame, CellColor, FrameBuffer, GlyphPalette, NoiseSource, PaletteId};
use crate::runtime::{spawn_periodic, Latest, LoopHandle};
use crate::settings::AdjustmentSettings;
use crate::source::{Frame, VideoSource};

/// Converts frames to glyph grids, reusing its buffers between ticks.
pub struct Converter {
    noise: Box<dyn NoiseSource + Send>,
    samples: FrameBuffer,
    glyphs: Vec<char>,
    palette: GlyphPalette,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("palette", &self.palette.name())
            .finish_non_exhaustive()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(Box::new(ascii::ThreadNoise))
    }
}

impl Converter {
    pub fn new(noise: Box<dyn NoiseSource + Send>) -> Self {
        Self {
            noise,
            samples: FrameBuffer {
                columns: 0,
                rows: 0,
                data: Vec::new(),
            },
            glyphs: Vec::new(),
            palette: PaletteId::Standard.palette(),
        }
    }

    fn palette_for(&mut self, id: PaletteId) -> &GlyphPalette {
        if self.palette.name() != id.name() {
            self.palette = id.palette();
        }
        &self.palette
    }

    /// Convert one frame. Returns `None` when the frame is not usable yet.
    pub fn convert(&mut self, frame: &Frame, settings: &AdjustmentSettings) -> Option<AsciiFrame> {
        let settings = settings.clamped();
        if !ascii::sample_into(
            frame,
            settings.resolution_columns,
            settings.mirror_horizontal,
            &mut self.samples,
        ) {
            return None;
        }

        self.palette_for(settings.palette);
        let palette_len = self.palette.len();
        self.glyphs.clear();
        self.glyphs.reserve(self.samples.len());
        for rgb in self.samples.data.chunks_exact(3) {
            let idx = ascii::glyph_index(
                rgb[0],
                rgb[1],
                rgb[2],
                &settings,
                palette_len,
                self.noise.as_mut(),
            );
            self.glyphs.push(self.palette.glyph(idx));
        }

        let mut out =
            AsciiFrame::from_glyphs(&self.glyphs, self.samples.columns, self.samples.rows);
        if settings.color_mode.is_true_color() {
            let colors = self
                .samples
                .data
                .chunks_exact(3)
                .map(|c| CellColor::new(c[0], c[1], c[2]))
                .collect();
            out = out.with_colors(colors);
        }
        Some(out)
    }

    /// One loop iteration: read the source, convert, publish.
    ///
    /// Returns false (and publishes nothing) when the source is not ready.
    pub fn tick(
        &mut self,
        source: &dyn VideoSource,
        settings: &AdjustmentSettings,
        output: &Latest<AsciiFrame>,
    ) -> bool {
        let Some(frame) = source.latest_frame() else {
            return false;
        };
        match self.convert(&frame, settings) {
            Some(ascii) => {
                output.publish(ascii);
                true
            }
            None => false,
        }
    }
}

/// Conversion loop bound to a source, a settings channel and an output cell.
pub struct ConversionLoop;

impl ConversionLoop {
    /// Start converting once per `period` until the handle is stopped.
    pub fn spawn(
        source: Arc<dyn VideoSource>,
        settings: watch::Receiver<AdjustmentSettings>,
        output: Latest<AsciiFrame>,
        period: Duration,
        mut converter: Converter,
    ) -> LoopHandle {
        spawn_periodic("conversion", period, move || {
            let snapshot = settings.borrow().clone();
            converter.tick(source.as_ref(), &snapshot, &output);
        })
    }
}
