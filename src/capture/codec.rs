//! Video format negotiation.

use std::collections::HashSet;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// A recordable container/codec combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    pub mime_type: &'static str,
    /// ffmpeg encoder name, `None` for the muxer's default
    pub encoder: Option<&'static str>,
    pub extension: &'static str,
}

pub const WEBM_VP9: VideoFormat = VideoFormat {
    mime_type: "video/webm;codecs=vp9",
    encoder: Some("libvpx-vp9"),
    extension: "webm",
};

pub const WEBM_VP8: VideoFormat = VideoFormat {
    mime_type: "video/webm;codecs=vp8",
    encoder: Some("libvpx"),
    extension: "webm",
};

pub const WEBM_BASELINE: VideoFormat = VideoFormat {
    mime_type: "video/webm",
    encoder: None,
    extension: "webm",
};

/// Formats in order of preference.
pub const PREFERRED_FORMATS: [VideoFormat; 3] = [WEBM_VP9, WEBM_VP8, WEBM_BASELINE];

/// Answers whether the platform can record a format.
pub trait CodecSupport: Send + Sync {
    fn supports(&self, format: &VideoFormat) -> bool;
}

/// First preferred format the platform supports, or the baseline container.
///
/// An unusable baseline surfaces later as a failure to open the sink.
pub fn negotiate(support: &dyn CodecSupport) -> VideoFormat {
    match PREFERRED_FORMATS
        .iter()
        .find(|format| support.supports(format))
    {
        Some(format) => {
            log::debug!("Negotiated recording format {}", format.mime_type);
            *format
        }
        None => {
            log::debug!("No preferred format supported, using {}", WEBM_BASELINE.mime_type);
            WEBM_BASELINE
        }
    }
}

/// Parse the encoder table printed by `ffmpeg -encoders`.
///
/// Rows after the `------` separator look like
/// ` V....D libvpx-vp9           libvpx VP9 (codec vp9)`.
pub fn parse_encoder_list(output: &str) -> HashSet<String> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

/// Encoder support as reported by the installed ffmpeg. Probed once.
#[derive(Debug, Default)]
pub struct FfmpegEncoders {
    encoders: OnceLock<Option<HashSet<String>>>,
}

impl FfmpegEncoders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a pre-captured encoder list.
    pub fn from_list(output: &str) -> Self {
        let encoders = OnceLock::new();
        let _ = encoders.set(Some(parse_encoder_list(output)));
        Self { encoders }
    }

    fn probe() -> Option<HashSet<String>> {
        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        match output {
            Ok(out) if out.status.success() => {
                Some(parse_encoder_list(&String::from_utf8_lossy(&out.stdout)))
            }
            Ok(out) => {
                log::warn!("ffmpeg -encoders exited with {}", out.status);
                None
            }
            Err(e) => {
                log::warn!("Could not run ffmpeg to probe encoders: {}", e);
                None
            }
        }
    }

    /// Whether ffmpeg is usable at all.
    pub fn available(&self) -> bool {
        self.encoders.get_or_init(Self::probe).is_some()
    }
}

impl CodecSupport for FfmpegEncoders {
    fn supports(&self, format: &VideoFormat) -> bool {
        match self.encoders.get_or_init(Self::probe) {
            None => false,
            Some(encoders) => match format.encoder {
                Some(name) => encoders.contains(name),
                None => encoders.contains("libvpx-vp9") || encoders.contains("libvpx"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Encoders:
 V..... = Video
 ------
 V....D libvpx               libvpx VP8 (codec vp8)
 V....D libvpx-vp9           libvpx VP9 (codec vp9)
 A....D libopus              libopus Opus (codec opus)
";

    struct Only(&'static [&'static str]);
    impl CodecSupport for Only {
        fn supports(&self, format: &VideoFormat) -> bool {
            self.0.contains(&format.mime_type)
        }
    }

    #[test]
    fn test_parse_encoder_list() {
        let encoders = parse_encoder_list(SAMPLE);
        assert!(encoders.contains("libvpx"));
        assert!(encoders.contains("libvpx-vp9"));
        assert!(encoders.contains("libopus"));
        assert!(!encoders.contains("="));
    }

    #[test]
    fn test_negotiate_prefers_vp9() {
        let support = FfmpegEncoders::from_list(SAMPLE);
        assert_eq!(negotiate(&support), WEBM_VP9);
    }

    #[test]
    fn test_negotiate_falls_back_in_order() {
        assert_eq!(
            negotiate(&Only(&["video/webm;codecs=vp8", "video/webm"])),
            WEBM_VP8
        );
        assert_eq!(negotiate(&Only(&["video/webm"])), WEBM_BASELINE);
    }

    #[test]
    fn test_negotiate_defaults_to_baseline() {
        assert_eq!(negotiate(&Only(&[])), WEBM_BASELINE);
        let no_vpx = FfmpegEncoders::from_list(" ------\n A....D aac   AAC\n");
        assert_eq!(negotiate(&no_vpx), WEBM_BASELINE);
    }

    #[test]
    fn test_baseline_needs_some_vpx_encoder() {
        let support = FfmpegEncoders::from_list(" ------\n A....D aac   AAC\n");
        assert!(support.available());
        assert!(!support.supports(&WEBM_BASELINE));
    }
}
