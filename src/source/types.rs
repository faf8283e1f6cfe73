//! Frame and source types shared by every video source.

use std::fmt;
use std::time::Instant;

/// A captured RGB frame (3 bytes per pixel, row-major).
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data in RGB format
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Bytes per pixel (always 3, RGB).
    pub const BYTES_PER_PIXEL: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// A frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * Self::BYTES_PER_PIXEL);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height)
    }

    /// Byte length a well-formed frame of this size has.
    pub fn expected_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * Self::BYTES_PER_PIXEL
    }

    /// Whether the frame has pixels and enough data to cover them.
    pub fn is_complete(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() >= self.expected_len()
    }

    /// RGB triple at (x, y). Caller guarantees bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * Self::BYTES_PER_PIXEL;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }
}

/// Capture resolution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Medium resolution (640x480), the usual webcam "ideal" size.
    pub const MEDIUM: Resolution = Resolution {
        width: 640,
        height: 480,
    };
}

impl Default for Resolution {
    fn default() -> Self {
        Self::MEDIUM
    }
}

/// An opaque, continuously updating video-frame source.
///
/// `latest_frame` returning `None` means "not ready yet"; it is not an error
/// and callers skip the tick.
pub trait VideoSource: Send + Sync {
    /// Current frame dimensions, if a frame has arrived.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// The most recent frame, if one is ready.
    fn latest_frame(&self) -> Option<std::sync::Arc<Frame>>;

    /// Whether a frame is ready.
    fn is_ready(&self) -> bool {
        self.latest_frame().is_some()
    }
}

/// Errors that can occur while acquiring a video source.
#[derive(Debug)]
pub enum SourceError {
    /// FFmpeg executable not found
    FfmpegNotFound,
    /// Failed to spawn the capture process
    SpawnFailed(std::io::Error),
    /// Camera permission denied
    PermissionDenied,
    /// Camera missing or could not be opened
    Unavailable(String),
    /// No frame arrived within the startup window
    NoFrames,
    /// Source is already running
    AlreadyRunning,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::FfmpegNotFound => {
                write!(
                    f,
                    "FFmpeg not found. Install it and verify `ffmpeg -version` works."
                )
            }
            SourceError::SpawnFailed(e) => write!(f, "Failed to spawn camera capture: {}", e),
            SourceError::PermissionDenied => write!(f, "Camera access denied or unavailable."),
            SourceError::Unavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            SourceError::NoFrames => write!(f, "Camera produced no frames"),
            SourceError::AlreadyRunning => write!(f, "Camera capture is already running"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::SpawnFailed(e) => Some(e),
            _ => None,
        }
    }
}
