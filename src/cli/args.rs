//! CLI argument parsing with clap.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{ColorArg, PaletteArg, ShareArg, SourceKind};
use crate::settings::SettingsPatch;

/// Live camera feed rendered as ASCII glyphs, with photo, clip and loop capture
#[derive(Parser, Debug)]
#[command(name = "ascii-stream")]
#[command(version, about = "Live ASCII camera feed with capture and export", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub adjust: AdjustArgs,

    /// Frame source
    #[arg(long, global = true, default_value = "camera")]
    pub source: SourceKind,

    /// Hide the status line
    #[arg(long, global = true)]
    pub no_status: bool,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

/// Adjustment flags. Unset flags keep the config file's value.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct AdjustArgs {
    /// Glyph palette
    #[arg(long, global = true)]
    pub palette: Option<PaletteArg>,

    /// Grid width in characters (40-500)
    #[arg(long, global = true)]
    pub columns: Option<u32>,

    /// Contrast multiplier (0.5-3.0)
    #[arg(long, global = true)]
    pub contrast: Option<f64>,

    /// Brightness offset (-100 to 100)
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub brightness: Option<i32>,

    /// Gamma (0.1-3.0)
    #[arg(long, global = true)]
    pub gamma: Option<f64>,

    /// Film grain amount (0.0-1.0)
    #[arg(long, global = true)]
    pub noise: Option<f64>,

    /// Invert brightness (for light terminals)
    #[arg(long, global = true)]
    pub invert: bool,

    /// Don't mirror the camera horizontally
    #[arg(long, global = true)]
    pub no_mirror: bool,

    /// Glyph colour
    #[arg(long, global = true)]
    pub color: Option<ColorArg>,

    /// Glow radius for captures (0-10)
    #[arg(long, global = true)]
    pub glow: Option<u32>,

    /// Scanline dimming in the terminal (0.0-1.0)
    #[arg(long, global = true)]
    pub scanlines: Option<f32>,

    /// Font size for captures in pixels (2-20)
    #[arg(long, global = true)]
    pub font_size: Option<u32>,
}

impl AdjustArgs {
    /// Settings changes requested on the command line.
    pub fn to_patch(&self) -> SettingsPatch {
        SettingsPatch {
            palette: self.palette.map(Into::into),
            resolution_columns: self.columns,
            contrast: self.contrast,
            brightness_offset: self.brightness,
            gamma: self.gamma,
            noise_amount: self.noise,
            inverted: self.invert.then_some(true),
            mirror_horizontal: self.no_mirror.then_some(false),
            color_mode: self.color.map(Into::into),
            glow_radius: self.glow,
            scanline_intensity: self.scanlines,
            font_size_px: self.font_size,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the live feed until Ctrl-C (default)
    Run,
    /// Capture a single PNG
    Snapshot {
        /// Output directory (default: config capture.output_dir)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Also print a share link
        #[arg(long)]
        share: Option<ShareArg>,
    },
    /// Record a WebM clip, optionally exporting a GIF loop
    Record {
        /// Clip length in seconds; Ctrl-C stops early
        #[arg(long, default_value_t = 5.0)]
        seconds: f32,
        /// Export a GIF loop when the clip is 10 seconds or shorter
        #[arg(long)]
        gif: bool,
        /// Output directory (default: config capture.output_dir)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Also print a share link
        #[arg(long)]
        share: Option<ShareArg>,
    },
    /// List glyph palettes
    Palettes,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ascii::PaletteId;
    use crate::settings::ColorMode;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["ascii-stream"]);
        assert!(args.command.is_none());
        assert_eq!(args.source, SourceKind::Camera);
        assert!(!args.no_status);
        assert!(args.config.is_none());
        assert!(args.adjust.to_patch().is_empty());
    }

    #[test]
    fn test_adjust_flags_build_patch() {
        let args = Args::parse_from([
            "ascii-stream",
            "--palette",
            "matrix",
            "--columns",
            "200",
            "--brightness",
            "-20",
            "--color",
            "true-color",
            "--invert",
            "--no-mirror",
        ]);
        let patch = args.adjust.to_patch();
        assert_eq!(patch.palette, Some(PaletteId::Matrix));
        assert_eq!(patch.resolution_columns, Some(200));
        assert_eq!(patch.brightness_offset, Some(-20));
        assert_eq!(patch.color_mode, Some(ColorMode::TrueColor));
        assert_eq!(patch.inverted, Some(true));
        assert_eq!(patch.mirror_horizontal, Some(false));
        assert_eq!(patch.gamma, None);
    }

    #[test]
    fn test_flags_after_subcommand() {
        let args = Args::parse_from([
            "ascii-stream",
            "snapshot",
            "--source",
            "pattern",
            "--glow",
            "4",
        ]);
        assert!(matches!(args.command, Some(Command::Snapshot { .. })));
        assert_eq!(args.source, SourceKind::Pattern);
        assert_eq!(args.adjust.glow, Some(4));
    }

    #[test]
    fn test_record_subcommand() {
        let args = Args::parse_from([
            "ascii-stream",
            "record",
            "--seconds",
            "3",
            "--gif",
            "--share",
            "whatsapp",
        ]);
        match args.command {
            Some(Command::Record {
                seconds,
                gif,
                share,
                output,
            }) => {
                assert_eq!(seconds, 3.0);
                assert!(gif);
                assert_eq!(share, Some(ShareArg::Whatsapp));
                assert!(output.is_none());
            }
            _ => panic!("Expected Record subcommand"),
        }
    }

    #[test]
    fn test_args_config_init_subcommand() {
        let args = Args::parse_from(["ascii-stream", "config", "init"]);
        match args.command {
            Some(Command::Config {
                action: ConfigAction::Init,
            }) => (),
            _ => panic!("Expected Config Init subcommand"),
        }
    }

    #[test]
    fn test_args_config_option() {
        let args = Args::parse_from(["ascii-stream", "-c", "/tmp/test.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
    }
}
