//! Capture pipeline: stills, clip recording and loop frame collection.
//!
//! The [`CaptureController`] owns the styled canvas and the recording state
//! machine. Encoded results come back as [`Artifact`]s ready to be saved or
//! shared.

mod codec;
mod controller;
mod errors;
mod still;
mod video;

use std::time::{SystemTime, UNIX_EPOCH};

pub use codec::{
    negotiate, parse_encoder_list, CodecSupport, FfmpegEncoders, VideoFormat, PREFERRED_FORMATS,
    WEBM_BASELINE, WEBM_VP8, WEBM_VP9,
};
pub use controller::{
    CaptureController, CaptureMode, CaptureState, ClipOutcome, PendingClip, RecordingLoop,
    RecordingOptions, MAX_LOOP_DURATION,
};
pub use errors::{CaptureError, EncodeError};
pub use still::{encode_png, snapshot, StillFrame};
pub use video::{
    ffmpeg_args, letterbox, FfmpegSinkFactory, FfmpegVideoSink, SinkFactory, VideoSink,
};

/// What produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Still,
    Clip,
    Loop,
}

impl ArtifactKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Still => "photo",
            ArtifactKind::Clip => "video",
            ArtifactKind::Loop => "gif",
        }
    }
}

/// An encoded capture.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub extension: String,
    pub created_at: SystemTime,
}

impl Artifact {
    pub fn still(png: Vec<u8>) -> Self {
        Self::new(ArtifactKind::Still, png, "image/png", "png")
    }

    pub fn clip(bytes: Vec<u8>, format: &VideoFormat) -> Self {
        Self::new(ArtifactKind::Clip, bytes, format.mime_type, format.extension)
    }

    pub fn gif(bytes: Vec<u8>) -> Self {
        Self::new(ArtifactKind::Loop, bytes, "image/gif", "gif")
    }

    fn new(kind: ArtifactKind, bytes: Vec<u8>, mime_type: &str, extension: &str) -> Self {
        Self {
            kind,
            bytes,
            mime_type: mime_type.to_string(),
            extension: extension.to_string(),
            created_at: SystemTime::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `ascii-stream-<unix millis>.<ext>`
    pub fn suggested_file_name(&self) -> String {
        let millis = self
            .created_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("ascii-stream-{}.{}", millis, self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_artifact_kinds_carry_mime_and_extension() {
        let still = Artifact::still(vec![1]);
        assert_eq!((still.mime_type.as_str(), still.extension.as_str()), ("image/png", "png"));
        let clip = Artifact::clip(vec![1], &WEBM_VP8);
        assert_eq!(clip.mime_type, "video/webm;codecs=vp8");
        assert_eq!(clip.extension, "webm");
        let gif = Artifact::gif(vec![1]);
        assert_eq!(gif.kind, ArtifactKind::Loop);
        assert_eq!(gif.mime_type, "image/gif");
    }

    #[test]
    fn test_suggested_file_name_uses_unix_millis() {
        let mut artifact = Artifact::gif(vec![]);
        artifact.created_at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(artifact.suggested_file_name(), "ascii-stream-1700000000123.gif");
    }
}
