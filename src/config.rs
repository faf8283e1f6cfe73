//! Configuration file handling for ascii-stream.
//!
//! Loads configuration from `~/.config/ascii-stream/config.toml` or a custom path.
//! The file only seeds startup defaults; nothing is written back at runtime.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::settings::SettingsPatch;
use crate::source::{CameraSettings, Resolution};

/// Configuration file structure for ascii-stream.
/// Loaded from ~/.config/ascii-stream/config.toml (or custom path via --config).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub adjust: SettingsPatch,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// ffmpeg input format override (e.g. `v4l2`, `avfoundation`, `dshow`)
    #[serde(default)]
    pub input_format: Option<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            input_format: None,
        }
    }
}

impl CameraConfig {
    pub fn to_settings(&self) -> CameraSettings {
        CameraSettings {
            device: self.device.clone(),
            resolution: Resolution {
                width: self.width,
                height: self.height,
            },
            fps: self.fps,
            input_format: self.input_format.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Where saved captures go. Defaults to the current directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// TTF/OTF used by the styled renderer. Block glyphs when unset.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_fps")]
    pub display_fps: u32,
    #[serde(default = "default_fps")]
    pub recording_fps: u32,
    #[serde(default = "default_loop_fps")]
    pub loop_fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            font_path: None,
            display_fps: default_fps(),
            recording_fps: default_fps(),
            loop_fps: default_loop_fps(),
        }
    }
}

impl CaptureConfig {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub status_line: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { status_line: true }
    }
}

fn default_true() -> bool {
    true
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_fps() -> u32 {
    30
}

fn default_loop_fps() -> u32 {
    10
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            Self::parse(&content).map_err(|e| ConfigError::ParseError { path, source: e })
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Write the default configuration to `path`, refusing to overwrite.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        let content = Config::default().to_toml()?;
        let io_err = |e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, content).map_err(io_err)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    SerializeError(toml::ser::Error),
    AlreadyExists(PathBuf),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::SerializeError(source) => {
                write!(f, "Failed to serialize config: {}", source)
            }
            ConfigError::AlreadyExists(path) => {
                write!(f, "Config file '{}' already exists", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::SerializeError(source) => Some(source),
            ConfigError::AlreadyExists(_) => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("ascii-stream").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/ascii-stream/config.toml")
        })
}
