//! Video-frame sources.
//!
//! The pipeline only sees the [`VideoSource`] trait. Two adapters ship
//! with the crate:
//! - [`FfmpegCamera`] reads a webcam through an ffmpeg child process
//! - [`TestPattern`] generates an animated gradient for demos and tests

mod ffmpeg;
mod pattern;
mod types;

pub use ffmpeg::{classify_failure, CameraSettings, FfmpegCamera};
pub use pattern::TestPattern;
pub use types::{Frame, Resolution, SourceError, VideoSource};
