//! A running ascii-stream session.
//!
//! Ties together a video source, the conversion loop, the capture
//! controller and the loop encoder. Must be started inside a tokio runtime.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::watch;

use crate::ascii::AsciiFrame;
use crate::capture::{
    Artifact, CaptureController, CaptureError, CaptureMode, ClipOutcome, RecordingLoop,
    RecordingOptions,
};
use crate::convert::{ConversionLoop, Converter};
use crate::encode::{LoopEncoder, LoopExport, LoopRequest};
use crate::runtime::{period_for_fps, Latest, LoopHandle};
use crate::settings::{AdjustmentSettings, SettingsPatch};
use crate::source::VideoSource;

/// Session tuning, usually taken from the config file.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub conversion_fps: u32,
    pub recording: RecordingOptions,
    pub output_dir: PathBuf,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            conversion_fps: 30,
            recording: RecordingOptions::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

pub struct Session {
    source: Arc<dyn VideoSource>,
    settings: watch::Sender<AdjustmentSettings>,
    frames: Latest<AsciiFrame>,
    conversion: LoopHandle,
    capture: Arc<Mutex<CaptureController>>,
    recording: Option<LoopHandle>,
    encoder: LoopEncoder,
    last_loop: Option<LoopRequest>,
    options: SessionOptions,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("recording", &self.recording.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start converting frames from `source`.
    pub fn start(
        source: Arc<dyn VideoSource>,
        controller: CaptureController,
        settings: AdjustmentSettings,
        options: SessionOptions,
    ) -> Self {
        Self::start_with_converter(source, controller, settings, options, Converter::default())
    }

    pub fn start_with_converter(
        source: Arc<dyn VideoSource>,
        controller: CaptureController,
        settings: AdjustmentSettings,
        options: SessionOptions,
        converter: Converter,
    ) -> Self {
        let (settings_tx, settings_rx) = watch::channel(settings.clamped());
        let frames = Latest::new();
        let conversion = ConversionLoop::spawn(
            Arc::clone(&source),
            settings_rx,
            frames.clone(),
            period_for_fps(options.conversion_fps),
            converter,
        );
        log::info!("Session started at {} fps", options.conversion_fps);
        Self {
            source,
            settings: settings_tx,
            frames,
            conversion,
            capture: Arc::new(Mutex::new(controller)),
            recording: None,
            encoder: LoopEncoder::spawn(),
            last_loop: None,
            options,
        }
    }

    fn controller(&self) -> MutexGuard<'_, CaptureController> {
        self.capture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn source(&self) -> &Arc<dyn VideoSource> {
        &self.source
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> AdjustmentSettings {
        self.settings.borrow().clone()
    }

    pub fn subscribe_settings(&self) -> watch::Receiver<AdjustmentSettings> {
        self.settings.subscribe()
    }

    /// Apply a partial update; values are clamped to their ranges.
    pub fn update_settings(&self, patch: &SettingsPatch) -> AdjustmentSettings {
        self.settings.send_modify(|s| s.apply(patch));
        self.settings()
    }

    pub fn reset_settings(&self) -> AdjustmentSettings {
        self.settings.send_modify(AdjustmentSettings::reset);
        self.settings()
    }

    /// The cell the conversion loop publishes into.
    pub fn frames(&self) -> Latest<AsciiFrame> {
        self.frames.clone()
    }

    pub fn latest_frame(&self) -> Option<Arc<AsciiFrame>> {
        self.frames.get()
    }

    pub fn capture_handle(&self) -> Arc<Mutex<CaptureController>> {
        Arc::clone(&self.capture)
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.controller().mode()
    }

    pub fn set_capture_mode(&self, mode: CaptureMode) {
        self.controller().set_mode(mode);
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Snapshot the latest frame as a PNG. `None` if there is no frame yet or
    /// encoding failed.
    pub fn capture_still(&self) -> Option<Artifact> {
        let frame = self.frames.get()?;
        let settings = self.settings();
        self.controller().capture_still(&frame, &settings)
    }

    /// Start recording a clip in clip mode.
    pub fn start_clip(&mut self) -> Result<(), CaptureError> {
        self.controller()
            .start_recording(self.options.recording, Instant::now())?;
        self.last_loop = None;
        self.recording = Some(RecordingLoop::spawn(
            Arc::clone(&self.capture),
            self.frames.clone(),
            self.settings.subscribe(),
            self.options.recording.video_fps,
        ));
        Ok(())
    }

    /// Stop the active recording and finalize the clip. `None` when idle.
    ///
    /// Loop frames from an eligible recording are kept for [`export_loop`].
    ///
    /// [`export_loop`]: Session::export_loop
    pub async fn stop_clip(&mut self) -> Option<ClipOutcome> {
        if let Some(mut handle) = self.recording.take() {
            handle.stop();
        }
        let pending = self.controller().stop_recording(Instant::now())?;
        let outcome = pending.finish().await;
        self.last_loop = outcome.loop_eligible().then(|| LoopRequest {
            frames: outcome.loop_frames.clone(),
            duration: outcome.duration,
            capture_fps: outcome.loop_fps,
        });
        Some(outcome)
    }

    /// Whether the last recording can be exported as a loop.
    pub fn loop_available(&self) -> bool {
        self.last_loop.is_some()
    }

    /// Encode the last recording's loop frames as a GIF.
    pub fn export_loop(&self) -> LoopExport {
        let request = self.last_loop.clone().unwrap_or(LoopRequest {
            frames: Vec::new(),
            duration: Default::default(),
            capture_fps: self.options.recording.loop_fps,
        });
        self.encoder.export(request)
    }

    /// Stop every loop, finalizing an active recording first.
    pub async fn shutdown(mut self) -> Option<ClipOutcome> {
        let outcome = self.stop_clip().await;
        self.conversion.stop();
        self.encoder.shutdown();
        log::info!("Session stopped");
        outcome
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut handle) = self.recording.take() {
            handle.stop();
        }
        self.conversion.stop();
    }
}
