//! ANSI terminal display for the live glyph stream.
//!
//! Draws each [`AsciiFrame`] at the top-left of the terminal using 24-bit
//! colour escapes. Odd rows are dimmed by the scanline intensity.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::watch;

use crate::ascii::{AsciiFrame, CellColor};
use crate::capture::{CaptureController, CaptureMode};
use crate::runtime::{period_for_fps, spawn_periodic, Latest, LoopHandle};
use crate::settings::{AdjustmentSettings, ColorMode};
use crate::styled::{matrix_gradient, tint};

/// Scale a colour for a scanline row.
pub fn scanline_dim(color: CellColor, row: u32, intensity: f32) -> CellColor {
    if row % 2 == 0 || intensity <= 0.0 {
        return color;
    }
    let k = 1.0 - intensity.clamp(0.0, 1.0) * 0.5;
    let dim = |c: u8| (c as f32 * k).round() as u8;
    CellColor::new(dim(color.r), dim(color.g), dim(color.b))
}

fn push_fg(output: &mut String, color: CellColor) {
    output.push_str(&format!("\x1b[38;2;{};{};{}m", color.r, color.g, color.b));
}

/// Build the escape sequence that draws `frame`, optionally followed by a
/// status line.
pub fn render_frame(
    frame: &AsciiFrame,
    settings: &AdjustmentSettings,
    status: Option<&str>,
) -> String {
    let mut output = String::with_capacity(frame.text.len() * 4);
    output.push_str("\x1b[H");

    for (row, line) in frame.lines().enumerate() {
        let row = row as u32;
        let row_color = match settings.color_mode {
            ColorMode::Matrix => {
                let t = if frame.rows > 1 {
                    row as f32 / (frame.rows - 1) as f32
                } else {
                    0.0
                };
                matrix_gradient(t)
            }
            mode => tint(mode),
        };
        if settings.color_mode.is_true_color() && frame.colors.is_some() {
            let mut last = None;
            for (col, ch) in line.chars().enumerate() {
                let color = frame.color_at(col as u32, row).unwrap_or(row_color);
                let color = scanline_dim(color, row, settings.scanline_intensity);
                if last != Some(color) {
                    push_fg(&mut output, color);
                    last = Some(color);
                }
                output.push(ch);
            }
        } else {
            push_fg(
                &mut output,
                scanline_dim(row_color, row, settings.scanline_intensity),
            );
            output.push_str(line);
        }
        output.push_str("\x1b[K\r\n");
    }

    output.push_str("\x1b[0m");
    if let Some(status) = status {
        output.push_str("\x1b[2m");
        output.push_str(status);
        output.push_str("\x1b[0m\x1b[K");
    }
    output.push_str("\x1b[J");
    output
}

/// Status line text for the current settings and capture state.
pub fn status_text(
    frame: &AsciiFrame,
    settings: &AdjustmentSettings,
    mode: CaptureMode,
    recording: Option<f32>,
) -> String {
    let mut status = format!(
        "{} | {}x{} | {} | {}",
        settings.palette,
        frame.columns,
        frame.rows,
        settings.color_mode,
        match mode {
            CaptureMode::Still => "photo",
            CaptureMode::Clip => "video",
        }
    );
    if let Some(secs) = recording {
        status.push_str(&format!(" | ● REC {:.1}s", secs));
    }
    status
}

/// Draws frames to a writer, skipping frames it has already drawn.
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    last_drawn: Option<Instant>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `frame` unless it is the one drawn last. Returns whether it drew.
    pub fn draw<W: Write>(
        &mut self,
        out: &mut W,
        frame: &AsciiFrame,
        settings: &AdjustmentSettings,
        status: Option<&str>,
    ) -> std::io::Result<bool> {
        if self.last_drawn == Some(frame.produced_at) {
            return Ok(false);
        }
        out.write_all(render_frame(frame, settings, status).as_bytes())?;
        out.flush()?;
        self.last_drawn = Some(frame.produced_at);
        Ok(true)
    }

    /// Clear the screen and hide the cursor.
    pub fn enter<W: Write>(out: &mut W) -> std::io::Result<()> {
        out.write_all(b"\x1b[?25l\x1b[2J\x1b[H")?;
        out.flush()
    }

    /// Restore the cursor and attributes.
    pub fn leave<W: Write>(out: &mut W) -> std::io::Result<()> {
        out.write_all(b"\x1b[0m\x1b[?25h\r\n")?;
        out.flush()
    }
}

/// Periodic redraw of the latest frame to stdout.
pub struct DisplayLoop;

impl DisplayLoop {
    pub fn spawn(
        frames: Latest<AsciiFrame>,
        settings: watch::Receiver<AdjustmentSettings>,
        capture: Arc<Mutex<CaptureController>>,
        fps: u32,
        show_status: bool,
    ) -> LoopHandle {
        let mut display = TerminalDisplay::new();
        spawn_periodic("display", period_for_fps(fps), move || {
            let Some(frame) = frames.get() else {
                return;
            };
            let snapshot = settings.borrow().clone();
            let status = show_status.then(|| {
                let controller = capture.lock().unwrap_or_else(PoisonError::into_inner);
                let recording = controller
                    .elapsed(Instant::now())
                    .map(|d| d.as_secs_f32());
                status_text(&frame, &snapshot, controller.mode(), recording)
            });
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = display.draw(&mut stdout, &frame, &snapshot, status.as_deref()) {
                log::warn!("Display write failed: {}", e);
            }
        })
    }
}
