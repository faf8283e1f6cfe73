//! Webcam source backed by an ffmpeg child process.
//!
//! ffmpeg opens the platform camera (AVFoundation, V4L2 or DirectShow),
//! scales to the requested size and writes raw `rgb24` frames to stdout.
//! A reader thread keeps only the newest frame.

use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::types::{Frame, Resolution, SourceError, VideoSource};
use crate::runtime::Latest;

/// How long `start` waits for the first frame.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while waiting for the first frame.
const STARTUP_POLL: Duration = Duration::from_millis(10);

/// Keywords in ffmpeg stderr that mean the OS refused camera access.
const PERMISSION_KEYWORDS: &[&str] = &[
    "permission",
    "denied",
    "not authorized",
    "authorization",
];

/// Settings for the ffmpeg camera.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Device name or index (None = platform default)
    pub device: Option<String>,
    /// Capture and output resolution
    pub resolution: Resolution,
    /// Requested capture framerate
    pub fps: u32,
    /// ffmpeg input format override (avfoundation, v4l2, dshow)
    pub input_format: Option<String>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: None,
            resolution: Resolution::default(),
            fps: 30,
            input_format: None,
        }
    }
}

impl CameraSettings {
    /// ffmpeg input format for the current platform.
    pub fn platform_input_format(&self) -> &str {
        if let Some(ref format) = self.input_format {
            return format;
        }
        if cfg!(target_os = "macos") {
            "avfoundation"
        } else if cfg!(target_os = "windows") {
            "dshow"
        } else {
            "v4l2"
        }
    }

    /// Device specifier in the form the input format expects.
    pub fn device_input(&self) -> String {
        let format = self.platform_input_format();
        match (format, self.device.as_deref()) {
            ("avfoundation", Some(dev)) => format!("{}:none", dev),
            ("avfoundation", None) => "0:none".to_string(),
            ("dshow", Some(dev)) => format!("video={}", dev),
            ("dshow", None) => "video=Integrated Camera".to_string(),
            (_, Some(dev)) if dev.parse::<u32>().is_ok() => format!("/dev/video{}", dev),
            (_, Some(dev)) => dev.to_string(),
            (_, None) => "/dev/video0".to_string(),
        }
    }

    /// Full ffmpeg argument list (excluding the `ffmpeg` command itself).
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let Resolution { width, height } = self.resolution;
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-f".to_string(),
            self.platform_input_format().to_string(),
            "-framerate".to_string(),
            self.fps.to_string(),
            "-video_size".to_string(),
            format!("{}x{}", width, height),
            "-i".to_string(),
            self.device_input(),
            "-vf".to_string(),
            format!("scale={}:{}", width, height),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "-".to_string(),
        ]
    }
}

/// Map ffmpeg's stderr from a failed start onto a [`SourceError`].
pub fn classify_failure(stderr: &[String]) -> SourceError {
    let joined = stderr.join("\n").to_lowercase();
    if PERMISSION_KEYWORDS.iter().any(|k| joined.contains(k)) {
        return SourceError::PermissionDenied;
    }
    match stderr.iter().rev().find(|l| !l.trim().is_empty()) {
        Some(line) => SourceError::Unavailable(line.trim().to_string()),
        None => SourceError::NoFrames,
    }
}

/// Camera capture handle.
///
/// Call `start()` to spawn ffmpeg; the latest decoded frame is then
/// available through [`VideoSource::latest_frame`].
pub struct FfmpegCamera {
    settings: CameraSettings,
    frames: Latest<Frame>,
    stop_signal: Arc<AtomicBool>,
    child: Option<Child>,
    reader_thread: Option<JoinHandle<()>>,
    stderr_thread: Option<JoinHandle<Vec<String>>>,
}

impl std::fmt::Debug for FfmpegCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegCamera")
            .field("settings", &self.settings)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FfmpegCamera {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            settings,
            frames: Latest::new(),
            stop_signal: Arc::new(AtomicBool::new(false)),
            child: None,
            reader_thread: None,
            stderr_thread: None,
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Spawn ffmpeg and wait until the first frame arrives.
    ///
    /// # Errors
    /// * `SourceError::AlreadyRunning` - If capture is already running
    /// * `SourceError::FfmpegNotFound` - If ffmpeg is not on PATH
    /// * `SourceError::PermissionDenied` - If the OS refused camera access
    /// * `SourceError::Unavailable` - If ffmpeg exited for another reason
    /// * `SourceError::NoFrames` - If nothing arrived within the startup window
    pub fn start(&mut self) -> Result<(), SourceError> {
        if self.is_running() {
            return Err(SourceError::AlreadyRunning);
        }
        self.stop_signal.store(false, Ordering::SeqCst);

        let args = self.settings.to_ffmpeg_args();
        log::info!("Starting camera: ffmpeg {}", args.join(" "));
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    SourceError::FfmpegNotFound
                } else {
                    SourceError::SpawnFailed(e)
                }
            })?;

        let Resolution { width, height } = self.settings.resolution;
        let frame_len = (width as usize) * (height as usize) * Frame::BYTES_PER_PIXEL;

        if let Some(mut stdout) = child.stdout.take() {
            let frames = self.frames.clone();
            let stop = Arc::clone(&self.stop_signal);
            self.reader_thread = Some(thread::spawn(move || {
                let mut buf = vec![0u8; frame_len];
                while !stop.load(Ordering::Relaxed) {
                    if stdout.read_exact(&mut buf).is_err() {
                        break;
                    }
                    frames.publish(Frame::new(buf.clone(), width, height));
                }
            }));
        }

        self.stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                let mut lines = Vec::new();
                for line in reader.lines() {
                    match line {
                        Ok(l) => {
                            log::debug!("[ffmpeg camera] {}", l);
                            lines.push(l);
                        }
                        Err(_) => break,
                    }
                }
                lines
            })
        });

        self.child = Some(child);
        self.wait_for_first_frame()
    }

    fn wait_for_first_frame(&mut self) -> Result<(), SourceError> {
        let deadline = Instant::now() + STARTUP_TIMEOUT;
        loop {
            if self.frames.get().is_some() {
                log::info!("Camera ready");
                return Ok(());
            }
            let exited = match self.child.as_mut() {
                Some(child) => matches!(child.try_wait(), Ok(Some(_))),
                None => true,
            };
            if exited {
                let stderr = self.collect_stderr();
                self.stop();
                let err = classify_failure(&stderr);
                log::error!("Camera failed to start: {}", err);
                return Err(err);
            }
            if Instant::now() >= deadline {
                self.stop();
                return Err(SourceError::NoFrames);
            }
            thread::sleep(STARTUP_POLL);
        }
    }

    fn collect_stderr(&mut self) -> Vec<String> {
        self.stderr_thread
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    }

    /// Stop ffmpeg and join the reader thread.
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.reader_thread
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl VideoSource for FfmpegCamera {
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.get().map(|f| (f.width, f.height))
    }

    fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.frames.get()
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        self.stop();
    }
}
