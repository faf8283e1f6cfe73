//! Error types for capture and encoding.

/// Errors from the capture controller.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// A recording is already active
    #[error("A recording is already in progress")]
    AlreadyRecording,
    /// Recording requested while the selector is on still capture
    #[error("Switch to clip mode before recording")]
    WrongMode,
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Errors from still, clip and video-sink encoding.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("FFmpeg not found. Install it to record clips (e.g. `brew install ffmpeg`).")]
    FfmpegNotFound,
    #[error("Failed to start encoder: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Encoder pipe closed")]
    PipeClosed,
    #[error("Encoder failed: {0}")]
    Failed(String),
    #[error("PNG encoding failed: {0}")]
    Png(String),
    #[error("Frame has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
}
