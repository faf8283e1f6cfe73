//! Export and share targets for captured artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::capture::Artifact;

/// Text attached to share intents.
pub const SHARE_TEXT: &str = "AsciiStream capture";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Twitter,
    WhatsApp,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Twitter, Platform::WhatsApp, Platform::Instagram];

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::WhatsApp => "whatsapp",
            Platform::Instagram => "instagram",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Some(Platform::Twitter),
            "whatsapp" => Some(Platform::WhatsApp),
            "instagram" => Some(Platform::Instagram),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("Sharing to {0} is only supported from the mobile app")]
    Unsupported(Platform),
    #[error("Nothing to share: the capture is empty")]
    Empty,
    #[error("Invalid share link: {0}")]
    InvalidUrl(String),
    #[error("Failed to save capture to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Web intent URL sharing `url` on `platform`.
pub fn share_intent_url(platform: Platform, url: &str) -> Result<String, ShareError> {
    let intent = match platform {
        Platform::Twitter => Url::parse_with_params(
            "https://twitter.com/intent/tweet",
            &[("text", SHARE_TEXT), ("url", url)],
        ),
        Platform::WhatsApp => Url::parse_with_params(
            "https://api.whatsapp.com/send",
            &[("text", format!("{} {}", SHARE_TEXT, url))],
        ),
        Platform::Instagram => return Err(ShareError::Unsupported(platform)),
    };
    intent
        .map(|intent| intent.to_string())
        .map_err(|e| ShareError::InvalidUrl(e.to_string()))
}

/// `file://` URL for a saved capture.
pub fn file_url(path: &Path) -> Result<Url, ShareError> {
    let absolute = std::fs::canonicalize(path).map_err(|source| ShareError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Url::from_file_path(&absolute)
        .map_err(|()| ShareError::InvalidUrl(absolute.display().to_string()))
}

/// Write `artifact` into `dir` under its suggested file name.
pub fn save_artifact(dir: &Path, artifact: &Artifact) -> Result<PathBuf, ShareError> {
    if artifact.is_empty() {
        return Err(ShareError::Empty);
    }
    let io_err = |path: &Path| {
        let path = path.display().to_string();
        move |source: std::io::Error| ShareError::Io { path, source }
    };
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = dir.join(artifact.suggested_file_name());
    std::fs::write(&path, &artifact.bytes).map_err(io_err(&path))?;
    log::info!("Saved {} to {}", artifact.kind.label(), path.display());
    Ok(path)
}

/// Result of sharing: where the file went and the link to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareOutcome {
    pub saved_to: PathBuf,
    pub intent_url: String,
}

/// Somewhere an artifact can be shared.
pub trait ShareTarget {
    fn share(&self, platform: Platform, artifact: &Artifact) -> Result<ShareOutcome, ShareError>;
}

/// Saves the artifact locally and builds an intent link pointing at it.
#[derive(Debug, Clone)]
pub struct LocalShare {
    dir: PathBuf,
}

impl LocalShare {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ShareTarget for LocalShare {
    fn share(&self, platform: Platform, artifact: &Artifact) -> Result<ShareOutcome, ShareError> {
        // check first so an unsupported platform writes nothing
        if platform == Platform::Instagram {
            return Err(ShareError::Unsupported(platform));
        }
        let saved_to = save_artifact(&self.dir, artifact)?;
        let url = file_url(&saved_to)?;
        let intent_url = share_intent_url(platform, url.as_str())?;
        Ok(ShareOutcome {
            saved_to,
            intent_url,
        })
    }
}
