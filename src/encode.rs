//! Animated loop (GIF) encoding on a background worker.
//!
//! Jobs are queued to a single worker task; each job runs on the blocking
//! pool so encoding never stalls the conversion or recording loops.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use gif::{Encoder, Frame as GifFrame, Repeat};
use image::ImageFormat;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::capture::{letterbox, Artifact, StillFrame, MAX_LOOP_DURATION};

/// NeuQuant sampling speed passed to the GIF quantizer (1 best, 30 fastest).
const QUANTIZE_SPEED: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoopExportError {
    #[error("Loop export unavailable: {0}")]
    Unavailable(String),
    #[error("Could not decode loop frame: {0}")]
    Decode(String),
    #[error("GIF encoding failed: {0}")]
    Encode(String),
    #[error("Loop encoder is not running")]
    EncoderUnavailable,
}

/// Frames to turn into a loop.
#[derive(Debug, Clone)]
pub struct LoopRequest {
    pub frames: Vec<StillFrame>,
    pub duration: Duration,
    pub capture_fps: u32,
}

impl LoopRequest {
    fn check(&self) -> Result<(), LoopExportError> {
        if self.duration > MAX_LOOP_DURATION {
            return Err(LoopExportError::Unavailable(format!(
                "recording was {:.1}s, loops are limited to {}s",
                self.duration.as_secs_f32(),
                MAX_LOOP_DURATION.as_secs()
            )));
        }
        if self.frames.is_empty() {
            return Err(LoopExportError::Unavailable("no frames were collected".into()));
        }
        Ok(())
    }
}

/// GIF frame delay in centiseconds for a capture rate.
pub fn frame_delay_cs(capture_fps: u32) -> u16 {
    let delay_ms = 1000 / capture_fps.max(1);
    ((delay_ms as f32) / 10.0).round().max(1.0) as u16
}

/// Encode PNG frames into an infinitely repeating GIF.
///
/// Frames of a different size than the first are letterboxed into it.
pub fn encode_gif(frames: &[StillFrame], capture_fps: u32) -> Result<Vec<u8>, LoopExportError> {
    let mut decoded = Vec::with_capacity(frames.len());
    for frame in frames {
        let rgba = image::load_from_memory_with_format(&frame.png, ImageFormat::Png)
            .map_err(|e| LoopExportError::Decode(e.to_string()))?
            .to_rgba8();
        decoded.push(rgba);
    }
    let first = decoded
        .first()
        .ok_or_else(|| LoopExportError::Unavailable("no frames were collected".into()))?;
    let (width, height) = first.dimensions();
    let too_large = || LoopExportError::Encode(format!("{}x{} exceeds GIF limits", width, height));
    let gif_w = u16::try_from(width).map_err(|_| too_large())?;
    let gif_h = u16::try_from(height).map_err(|_| too_large())?;
    let delay = frame_delay_cs(capture_fps);

    let mut out = Vec::new();
    {
        let mut encoder = Encoder::new(&mut out, gif_w, gif_h, &[])
            .map_err(|e| LoopExportError::Encode(e.to_string()))?;
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| LoopExportError::Encode(e.to_string()))?;
        for image in decoded {
            let (w, h) = image.dimensions();
            let mut pixels = if (w, h) == (width, height) {
                image.into_raw()
            } else {
                letterbox(image.as_raw(), w, h, width, height)
            };
            let mut frame = GifFrame::from_rgba_speed(gif_w, gif_h, &mut pixels, QUANTIZE_SPEED);
            frame.delay = delay;
            encoder
                .write_frame(&frame)
                .map_err(|e| LoopExportError::Encode(e.to_string()))?;
        }
    }
    Ok(out)
}

struct Job {
    request: LoopRequest,
    reply: oneshot::Sender<Result<Artifact, LoopExportError>>,
}

/// Handle to the loop-encoding worker.
#[derive(Debug)]
pub struct LoopEncoder {
    jobs: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
}

impl LoopEncoder {
    /// Start the worker on the current tokio runtime.
    pub fn spawn() -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker = tokio::spawn(async move {
            while let Some(Job { request, reply }) = rx.recv().await {
                let frame_count = request.frames.len();
                let result = tokio::task::spawn_blocking(move || {
                    encode_gif(&request.frames, request.capture_fps).map(Artifact::gif)
                })
                .await
                .unwrap_or_else(|e| Err(LoopExportError::Encode(e.to_string())));
                match &result {
                    Ok(artifact) => log::info!(
                        "Encoded loop from {} frames ({} bytes)",
                        frame_count,
                        artifact.len()
                    ),
                    Err(e) => log::warn!("{}", e),
                }
                let _ = reply.send(result);
            }
            log::debug!("Loop encoder stopped");
        });
        Self { jobs, worker }
    }

    /// Queue a loop export. Ineligible requests fail without being queued.
    pub fn export(&self, request: LoopRequest) -> LoopExport {
        if let Err(e) = request.check() {
            return LoopExport::ready(Err(e));
        }
        let (reply, rx) = oneshot::channel();
        match self.jobs.send(Job { request, reply }) {
            Ok(()) => LoopExport {
                state: ExportState::Pending(rx),
            },
            Err(_) => LoopExport::ready(Err(LoopExportError::EncoderUnavailable)),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Stop the worker. Queued jobs resolve to `EncoderUnavailable`.
    pub fn shutdown(&self) {
        self.worker.abort();
    }
}

/// A pending loop export.
#[derive(Debug)]
pub struct LoopExport {
    state: ExportState,
}

#[derive(Debug)]
enum ExportState {
    Ready(Option<Result<Artifact, LoopExportError>>),
    Pending(oneshot::Receiver<Result<Artifact, LoopExportError>>),
}

impl LoopExport {
    fn ready(result: Result<Artifact, LoopExportError>) -> Self {
        Self {
            state: ExportState::Ready(Some(result)),
        }
    }
}

impl Future for LoopExport {
    type Output = Result<Artifact, LoopExportError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            ExportState::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(LoopExportError::EncoderUnavailable)))
            }
            ExportState::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|r| r.unwrap_or(Err(LoopExportError::EncoderUnavailable))),
        }
    }
}
