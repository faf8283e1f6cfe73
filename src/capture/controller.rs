//! Recording state machine.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use super::codec::{negotiate, CodecSupport, FfmpegEncoders, VideoFormat};
use super::errors::CaptureError;
use super::still::{encode_png, snapshot, StillFrame};
use super::video::{letterbox, FfmpegSinkFactory, SinkFactory, VideoSink};
use super::Artifact;
use crate::ascii::AsciiFrame;
use crate::runtime::{period_for_fps, spawn_periodic, Latest, LoopHandle};
use crate::settings::AdjustmentSettings;
use crate::styled::StyledCanvas;

/// Longest recording whose frames can still become a loop.
pub const MAX_LOOP_DURATION: Duration = Duration::from_secs(10);

/// What the capture button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    Still,
    Clip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
}

/// Timing parameters for a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingOptions {
    pub video_fps: u32,
    pub loop_fps: u32,
    pub max_loop_duration: Duration,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            video_fps: 30,
            loop_fps: 10,
            max_loop_duration: MAX_LOOP_DURATION,
        }
    }
}

struct ActiveRecording {
    options: RecordingOptions,
    format: VideoFormat,
    started_at: Instant,
    sink: Option<Box<dyn VideoSink>>,
    sink_failed: bool,
    frames_recorded: u64,
    loop_frames: Vec<StillFrame>,
    collecting_loop: bool,
    next_loop_frame: Instant,
}

/// Owns the styled canvas and at most one active recording.
pub struct CaptureController {
    mode: CaptureMode,
    canvas: StyledCanvas,
    codecs: Arc<dyn CodecSupport>,
    sinks: Arc<dyn SinkFactory>,
    active: Option<ActiveRecording>,
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("mode", &self.mode)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CaptureController {
    pub fn new(
        canvas: StyledCanvas,
        codecs: Arc<dyn CodecSupport>,
        sinks: Arc<dyn SinkFactory>,
    ) -> Self {
        Self {
            mode: CaptureMode::default(),
            canvas,
            codecs,
            sinks,
            active: None,
        }
    }

    /// Controller recording through the installed ffmpeg.
    pub fn with_ffmpeg(canvas: StyledCanvas) -> Self {
        Self::new(
            canvas,
            Arc::new(FfmpegEncoders::new()),
            Arc::new(FfmpegSinkFactory),
        )
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Change the selector. An active recording is unaffected.
    pub fn set_mode(&mut self, mode: CaptureMode) {
        self.mode = mode;
    }

    pub fn state(&self) -> CaptureState {
        if self.active.is_some() {
            CaptureState::Recording
        } else {
            CaptureState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Time since the recording started, if one is active.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.active
            .as_ref()
            .map(|rec| now.saturating_duration_since(rec.started_at))
    }

    /// Loop frames collected so far in the active recording.
    pub fn loop_frame_count(&self) -> usize {
        self.active.as_ref().map_or(0, |rec| rec.loop_frames.len())
    }

    pub fn canvas(&self) -> &StyledCanvas {
        &self.canvas
    }

    /// Render `frame` once and encode it as PNG.
    pub fn capture_still(
        &mut self,
        frame: &AsciiFrame,
        settings: &AdjustmentSettings,
    ) -> Option<Artifact> {
        let surface = self.canvas.render(frame, settings);
        if surface.is_empty() {
            log::warn!("Nothing to capture: frame has no cells");
            return None;
        }
        match encode_png(surface) {
            Ok(png) => {
                log::info!("Captured still ({} bytes)", png.len());
                Some(Artifact::still(png))
            }
            Err(e) => {
                log::warn!("Still capture failed: {}", e);
                None
            }
        }
    }

    /// Begin recording. The video sink opens on the first recorded frame.
    pub fn start_recording(
        &mut self,
        options: RecordingOptions,
        now: Instant,
    ) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }
        if self.mode != CaptureMode::Clip {
            return Err(CaptureError::WrongMode);
        }
        let format = negotiate(self.codecs.as_ref());
        self.active = Some(ActiveRecording {
            options,
            format,
            started_at: now,
            sink: None,
            sink_failed: false,
            frames_recorded: 0,
            loop_frames: Vec::new(),
            collecting_loop: true,
            next_loop_frame: now,
        });
        log::info!("Recording started ({})", format.mime_type);
        Ok(())
    }

    /// Record one frame of the active recording. No-op when idle.
    pub fn record_tick(&mut self, frame: &AsciiFrame, settings: &AdjustmentSettings, now: Instant) {
        let Some(rec) = self.active.as_mut() else {
            return;
        };
        let surface = self.canvas.render(frame, settings);
        if surface.is_empty() {
            return;
        }

        if rec.sink.is_none() && !rec.sink_failed {
            match self.sinks.open(
                &rec.format,
                surface.width,
                surface.height,
                rec.options.video_fps,
            ) {
                Ok(sink) => rec.sink = Some(sink),
                Err(e) => {
                    log::warn!("Could not open video encoder, clip will be empty: {}", e);
                    rec.sink_failed = true;
                }
            }
        }
        if let Some(sink) = rec.sink.as_mut() {
            let (w, h) = sink.dimensions();
            let pushed = if (w, h) == (surface.width, surface.height) {
                sink.push_frame(&surface.pixels)
            } else {
                let fitted = letterbox(&surface.pixels, surface.width, surface.height, w, h);
                sink.push_frame(&fitted)
            };
            match pushed {
                Ok(()) => rec.frames_recorded += 1,
                Err(e) => {
                    log::warn!("Video encoder stopped accepting frames: {}", e);
                    rec.sink = None;
                    rec.sink_failed = true;
                }
            }
        }

        if !rec.collecting_loop {
            return;
        }
        let elapsed = now.saturating_duration_since(rec.started_at);
        if elapsed > rec.options.max_loop_duration {
            log::info!(
                "Recording passed {}s, discarding {} loop frame(s)",
                rec.options.max_loop_duration.as_secs(),
                rec.loop_frames.len()
            );
            rec.loop_frames.clear();
            rec.collecting_loop = false;
            return;
        }
        if now < rec.next_loop_frame {
            return;
        }
        match snapshot(surface, now) {
            Ok(still) => rec.loop_frames.push(still),
            Err(e) => log::warn!("Dropped loop frame: {}", e),
        }
        // fixed schedule from the start; slots missed during a stall are skipped
        let interval = period_for_fps(rec.options.loop_fps);
        while rec.next_loop_frame <= now {
            rec.next_loop_frame += interval;
        }
    }

    /// End the active recording. `None` when idle.
    pub fn stop_recording(&mut self, now: Instant) -> Option<PendingClip> {
        let rec = self.active.take()?;
        let duration = now.saturating_duration_since(rec.started_at);
        let loop_frames = if duration > rec.options.max_loop_duration {
            Vec::new()
        } else {
            rec.loop_frames
        };
        log::info!(
            "Recording stopped after {:.2}s ({} frames, {} loop frames)",
            duration.as_secs_f32(),
            rec.frames_recorded,
            loop_frames.len()
        );
        Some(PendingClip {
            format: rec.format,
            sink: rec.sink,
            duration,
            loop_fps: rec.options.loop_fps,
            loop_frames,
        })
    }
}

/// A stopped recording whose video has not been finalized yet.
pub struct PendingClip {
    format: VideoFormat,
    sink: Option<Box<dyn VideoSink>>,
    pub duration: Duration,
    pub loop_fps: u32,
    pub loop_frames: Vec<StillFrame>,
}

impl std::fmt::Debug for PendingClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingClip")
            .field("format", &self.format.mime_type)
            .field("duration", &self.duration)
            .field("loop_frames", &self.loop_frames.len())
            .finish_non_exhaustive()
    }
}

/// Result of finalizing a recording.
#[derive(Debug)]
pub struct ClipOutcome {
    pub clip: Option<Artifact>,
    pub duration: Duration,
    pub loop_fps: u32,
    pub loop_frames: Vec<StillFrame>,
}

impl ClipOutcome {
    /// Whether the collected frames can be exported as a loop.
    pub fn loop_eligible(&self) -> bool {
        self.duration <= MAX_LOOP_DURATION && !self.loop_frames.is_empty()
    }
}

impl PendingClip {
    pub fn format(&self) -> &VideoFormat {
        &self.format
    }

    /// Flush the encoder on a blocking thread.
    pub async fn finish(self) -> ClipOutcome {
        let format = self.format;
        let clip = match self.sink {
            None => None,
            Some(sink) => match tokio::task::spawn_blocking(move || sink.finish()).await {
                Ok(Ok(bytes)) if !bytes.is_empty() => Some(Artifact::clip(bytes, &format)),
                Ok(Ok(_)) => {
                    log::warn!("Encoder produced no data, no clip saved");
                    None
                }
                Ok(Err(e)) => {
                    log::warn!("Clip encoding failed: {}", e);
                    None
                }
                Err(e) => {
                    log::warn!("Clip encoding task failed: {}", e);
                    None
                }
            },
        };
        ClipOutcome {
            clip,
            duration: self.duration,
            loop_fps: self.loop_fps,
            loop_frames: self.loop_frames,
        }
    }
}

/// The 30 fps tick that feeds an active recording.
pub struct RecordingLoop;

impl RecordingLoop {
    pub fn spawn(
        controller: Arc<Mutex<CaptureController>>,
        frames: Latest<AsciiFrame>,
        settings: watch::Receiver<AdjustmentSettings>,
        fps: u32,
    ) -> LoopHandle {
        spawn_periodic("recording", period_for_fps(fps), move || {
            let Some(frame) = frames.get() else {
                return;
            };
            let snapshot = settings.borrow().clone();
            let Ok(mut controller) = controller.lock() else {
                return;
            };
            controller.record_tick(&frame, &snapshot, Instant::now());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::codec::{WEBM_BASELINE, WEBM_VP9};
    use crate::capture::EncodeError;

    struct AllFormats;
    impl CodecSupport for AllFormats {
        fn supports(&self, _: &VideoFormat) -> bool {
            true
        }
    }

    struct NoFormats;
    impl CodecSupport for NoFormats {
        fn supports(&self, _: &VideoFormat) -> bool {
            false
        }
    }

    struct CountingSink {
        size: (u32, u32),
        frames: usize,
    }
    impl VideoSink for CountingSink {
        fn dimensions(&self) -> (u32, u32) {
            self.size
        }
        fn push_frame(&mut self, rgba: &[u8]) -> Result<(), EncodeError> {
            assert_eq!(rgba.len(), (self.size.0 * self.size.1 * 4) as usize);
            self.frames += 1;
            Ok(())
        }
        fn finish(self: Box<Self>) -> Result<Vec<u8>, EncodeError> {
            Ok(vec![0u8; self.frames])
        }
    }

    struct CountingSinks;
    impl SinkFactory for CountingSinks {
        fn open(
            &self,
            _: &VideoFormat,
            width: u32,
            height: u32,
            _: u32,
        ) -> Result<Box<dyn VideoSink>, EncodeError> {
            Ok(Box::new(CountingSink {
                size: (width, height),
                frames: 0,
            }))
        }
    }

    fn controller(codecs: Arc<dyn CodecSupport>) -> CaptureController {
        let mut c =
            CaptureController::new(StyledCanvas::default(), codecs, Arc::new(CountingSinks));
        c.set_mode(CaptureMode::Clip);
        c
    }

    fn frame(cols: usize) -> AsciiFrame {
        AsciiFrame::from_glyphs(&vec!['#'; cols * 2], cols as u32, 2)
    }

    fn small() -> AdjustmentSettings {
        AdjustmentSettings {
            font_size_px: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_start_requires_clip_mode() {
        let mut c = controller(Arc::new(AllFormats));
        c.set_mode(CaptureMode::Still);
        assert!(matches!(
            c.start_recording(RecordingOptions::default(), Instant::now()),
            Err(CaptureError::WrongMode)
        ));
        assert_eq!(c.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_start_without_preferred_formats_records_baseline() {
        let mut c = controller(Arc::new(NoFormats));
        let t0 = Instant::now();
        c.start_recording(RecordingOptions::default(), t0).unwrap();
        assert!(c.is_recording());
        c.record_tick(&frame(4), &small(), t0);
        let pending = c.stop_recording(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(pending.format(), &WEBM_BASELINE);
        let clip = pending.finish().await.clip.unwrap();
        assert_eq!(clip.mime_type, "video/webm");
    }

    #[test]
    fn test_loop_frames_collected_at_loop_rate() {
        let mut c = controller(Arc::new(AllFormats));
        let t0 = Instant::now();
        c.start_recording(RecordingOptions::default(), t0).unwrap();
        // 30 ticks over one second at 30 fps
        for i in 0..30u64 {
            c.record_tick(&frame(4), &small(), t0 + Duration::from_millis(i * 1000 / 30));
        }
        assert_eq!(c.loop_frame_count(), 10);
    }

    #[test]
    fn test_loop_rate_holds_when_ticks_miss_the_interval() {
        let mut c = controller(Arc::new(AllFormats));
        let t0 = Instant::now();
        c.start_recording(RecordingOptions::default(), t0).unwrap();
        for i in 0..31u64 {
            c.record_tick(&frame(4), &small(), t0 + Duration::from_millis(i * 33));
        }
        assert_eq!(c.loop_frame_count(), 10);
    }

    #[test]
    fn test_stalled_ticks_skip_missed_loop_slots() {
        let mut c = controller(Arc::new(AllFormats));
        let t0 = Instant::now();
        c.start_recording(RecordingOptions::default(), t0).unwrap();
        c.record_tick(&frame(4), &small(), t0);
        c.record_tick(&frame(4), &small(), t0 + Duration::from_millis(450));
        c.record_tick(&frame(4), &small(), t0 + Duration::from_millis(480));
        assert_eq!(c.loop_frame_count(), 2);
        c.record_tick(&frame(4), &small(), t0 + Duration::from_millis(500));
        assert_eq!(c.loop_frame_count(), 3);
    }

    #[test]
    fn test_tick_past_threshold_discards_loop_frames() {
        let mut c = controller(Arc::new(AllFormats));
        let t0 = Instant::now();
        c.start_recording(RecordingOptions::default(), t0).unwrap();
        c.record_tick(&frame(4), &small(), t0);
        assert_eq!(c.loop_frame_count(), 1);
        c.record_tick(&frame(4), &small(), t0 + Duration::from_millis(10_050));
        assert_eq!(c.loop_frame_count(), 0);
        c.record_tick(&frame(4), &small(), t0 + Duration::from_millis(10_500));
        assert_eq!(c.loop_frame_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_returns_clip_with_negotiated_mime() {
        let mut c = controller(Arc::new(AllFormats));
        let t0 = Instant::now();
        c.start_recording(RecordingOptions::default(), t0).unwrap();
        c.record_tick(&frame(4), &small(), t0);
        c.record_tick(&frame(6), &small(), t0 + Duration::from_millis(40));
        let pending = c.stop_recording(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(pending.format(), &WEBM_VP9);
        let outcome = pending.finish().await;
        let clip = outcome.clip.as_ref().unwrap();
        assert_eq!(clip.mime_type, "video/webm;codecs=vp9");
        assert_eq!(clip.bytes.len(), 2);
        assert!(outcome.loop_eligible());
    }

    #[tokio::test]
    async fn test_stop_without_frames_yields_no_clip() {
        let mut c = controller(Arc::new(AllFormats));
        let t0 = Instant::now();
        c.start_recording(RecordingOptions::default(), t0).unwrap();
        let outcome = c.stop_recording(t0).unwrap().finish().await;
        assert!(outcome.clip.is_none());
        assert!(!outcome.loop_eligible());
    }

    #[test]
    fn test_still_capture_while_recording() {
        let mut c = controller(Arc::new(AllFormats));
        c.start_recording(RecordingOptions::default(), Instant::now())
            .unwrap();
        let still = c.capture_still(&frame(3), &small()).unwrap();
        assert_eq!(still.mime_type, "image/png");
        assert!(c.is_recording());
    }
}
