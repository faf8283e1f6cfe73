//! Subcommand handlers.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::args::ConfigAction;
use super::enums::{ShareArg, SourceKind};
use crate::ascii::{AsciiFrame, PaletteId};
use crate::capture::{Artifact, CaptureController, CaptureMode, RecordingOptions};
use crate::config::{default_path as get_config_path, Config};
use crate::display::{DisplayLoop, TerminalDisplay};
use crate::session::{Session, SessionOptions};
use crate::settings::{AdjustmentSettings, SettingsPatch};
use crate::share::{save_artifact, LocalShare, ShareTarget};
use crate::source::{FfmpegCamera, TestPattern, VideoSource};
use crate::styled::StyledCanvas;

pub type CommandResult = Result<(), Box<dyn Error>>;

/// How long to wait for the first converted frame.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Everything a capture command needs, resolved from config and flags.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    pub source: SourceKind,
    pub patch: SettingsPatch,
    pub show_status: bool,
    pub stop: Arc<AtomicBool>,
}

impl RunContext {
    /// Settings: built-in defaults, then config file, then command line.
    pub fn settings(&self) -> AdjustmentSettings {
        let mut settings = AdjustmentSettings::default();
        settings.apply(&self.config.adjust);
        settings.apply(&self.patch);
        settings
    }

    fn session_options(&self) -> SessionOptions {
        let capture = &self.config.capture;
        SessionOptions {
            conversion_fps: capture.display_fps,
            recording: RecordingOptions {
                video_fps: capture.recording_fps,
                loop_fps: capture.loop_fps,
                ..RecordingOptions::default()
            },
            output_dir: capture.output_dir(),
        }
    }

    fn open_source(&self) -> Result<Arc<dyn VideoSource>, Box<dyn Error>> {
        match self.source {
            SourceKind::Camera => {
                let mut camera = FfmpegCamera::new(self.config.camera.to_settings());
                camera.start()?;
                Ok(Arc::new(camera))
            }
            SourceKind::Pattern => Ok(Arc::new(TestPattern::new(
                self.config.camera.width,
                self.config.camera.height,
            ))),
        }
    }

    /// Open the source and start a session.
    pub fn start_session(&self) -> Result<Session, Box<dyn Error>> {
        let source = self.open_source()?;
        let canvas = StyledCanvas::with_font_or_blocks(self.config.capture.font_path.as_deref());
        let controller = CaptureController::with_ffmpeg(canvas);
        Ok(Session::start(
            source,
            controller,
            self.settings(),
            self.session_options(),
        ))
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

async fn wait_for_frame(session: &Session, stop: &AtomicBool) -> Option<Arc<AsciiFrame>> {
    let deadline = Instant::now() + FIRST_FRAME_TIMEOUT;
    while Instant::now() < deadline && !stop.load(Ordering::SeqCst) {
        if let Some(frame) = session.latest_frame() {
            return Some(frame);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    None
}

fn output_dir(session: &Session, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| session.options().output_dir.clone())
}

fn deliver(dir: &Path, artifact: &Artifact, share: Option<ShareArg>) -> CommandResult {
    match share {
        Some(platform) => {
            let outcome = LocalShare::new(dir).share(platform.into(), artifact)?;
            println!("Saved {}", outcome.saved_to.display());
            println!("Share: {}", outcome.intent_url);
        }
        None => {
            let path = save_artifact(dir, artifact)?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

/// Live view until Ctrl-C.
pub async fn run_live(ctx: &RunContext) -> CommandResult {
    let session = ctx.start_session()?;
    let mut stdout = std::io::stdout();
    TerminalDisplay::enter(&mut stdout)?;
    let mut display = DisplayLoop::spawn(
        session.frames(),
        session.subscribe_settings(),
        session.capture_handle(),
        ctx.config.capture.display_fps,
        ctx.show_status,
    );
    while !ctx.stopped() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    display.stop();
    TerminalDisplay::leave(&mut stdout)?;
    session.shutdown().await;
    Ok(())
}

/// Capture one PNG and save it.
pub async fn snapshot(
    ctx: &RunContext,
    output: Option<PathBuf>,
    share: Option<ShareArg>,
) -> CommandResult {
    let session = ctx.start_session()?;
    let frame = wait_for_frame(&session, &ctx.stop).await;
    let artifact = match frame {
        Some(_) => session.capture_still(),
        None => None,
    };
    let dir = output_dir(&session, output);
    session.shutdown().await;
    let artifact = artifact.ok_or("No frame was captured")?;
    deliver(&dir, &artifact, share)
}

/// Recording length from `--seconds`, at least 0.1s.
fn recording_length(seconds: f32) -> Result<Duration, Box<dyn Error>> {
    Duration::try_from_secs_f32(seconds.max(0.1))
        .map_err(|e| format!("Invalid recording length {}: {}", seconds, e).into())
}

/// Record a clip for `seconds` (or until Ctrl-C), then save it and optionally a loop.
pub async fn record(
    ctx: &RunContext,
    seconds: f32,
    gif: bool,
    output: Option<PathBuf>,
    share: Option<ShareArg>,
) -> CommandResult {
    let length = recording_length(seconds)?;
    let mut session = ctx.start_session()?;
    if wait_for_frame(&session, &ctx.stop).await.is_none() {
        session.shutdown().await;
        return Err("No frames from source".into());
    }
    session.set_capture_mode(CaptureMode::Clip);
    session.start_clip()?;
    println!("Recording... (Ctrl-C to stop)");

    let started = Instant::now();
    while started.elapsed() < length && !ctx.stopped() {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    let dir = output_dir(&session, output);
    let outcome = session.stop_clip().await;

    if let Some(clip) = outcome.as_ref().and_then(|o| o.clip.as_ref()) {
        deliver(&dir, clip, share)?;
    } else {
        eprintln!("No video was produced.");
    }
    if gif {
        if session.loop_available() {
            match session.export_loop().await {
                Ok(artifact) => deliver(&dir, &artifact, share)?,
                Err(e) => eprintln!("{}", e),
            }
        } else {
            eprintln!("GIF loops are only available for recordings of 10 seconds or less.");
        }
    }
    session.shutdown().await;
    Ok(())
}

/// Print the built-in palettes.
pub fn list_palettes() {
    println!("Available palettes (dark to light):");
    for id in PaletteId::ALL {
        println!("  {:<10} \"{}\"", id.name(), id.glyphs());
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    path: Option<&Path>,
    config: &Config,
) -> CommandResult {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            println!();
            println!("{}", config.to_toml()?);
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            Config::write_default(&config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}
