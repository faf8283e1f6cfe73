//! Video sinks: where recorded RGBA frames go.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use super::codec::VideoFormat;
use super::errors::EncodeError;

/// Frames buffered between the recording loop and the encoder.
const FRAME_QUEUE_DEPTH: usize = 8;

/// Consumes fixed-size RGBA frames and produces container bytes.
pub trait VideoSink: Send {
    /// Frame size the sink was opened with.
    fn dimensions(&self) -> (u32, u32);

    /// Queue one RGBA frame of exactly `dimensions()`.
    fn push_frame(&mut self, rgba: &[u8]) -> Result<(), EncodeError>;

    /// Flush and return the encoded bytes. May be empty.
    fn finish(self: Box<Self>) -> Result<Vec<u8>, EncodeError>;
}

/// Opens sinks for a negotiated format.
pub trait SinkFactory: Send + Sync {
    fn open(
        &self,
        format: &VideoFormat,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn VideoSink>, EncodeError>;
}

/// Opens [`FfmpegVideoSink`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegSinkFactory;

impl SinkFactory for FfmpegSinkFactory {
    fn open(
        &self,
        format: &VideoFormat,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn VideoSink>, EncodeError> {
        Ok(Box::new(FfmpegVideoSink::spawn(format, width, height, fps)?))
    }
}

/// Build the ffmpeg arguments for encoding raw RGBA from stdin to WebM on stdout.
pub fn ffmpeg_args(format: &VideoFormat, width: u32, height: u32, fps: u32) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("{}x{}", width, height));
    args.push("-r".into());
    args.push(fps.to_string());
    args.extend(["-i", "-"].map(String::from));
    if let Some(encoder) = format.encoder {
        args.push("-c:v".into());
        args.push(encoder.into());
    }
    args.extend(
        [
            "-vf",
            "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            "-pix_fmt",
            "yuv420p",
            "-deadline",
            "realtime",
            "-f",
            format.extension,
            "-",
        ]
        .map(String::from),
    );
    args
}

/// Encodes through an ffmpeg child process.
///
/// Frames go through a bounded channel to a writer thread feeding stdin,
/// and a reader thread collects stdout. A full queue drops the frame.
pub struct FfmpegVideoSink {
    width: u32,
    height: u32,
    child: Child,
    frames: Option<SyncSender<Vec<u8>>>,
    writer: Option<JoinHandle<std::io::Result<()>>>,
    reader: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    dropped: u64,
}

impl FfmpegVideoSink {
    pub fn spawn(
        format: &VideoFormat,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self, EncodeError> {
        let args = ffmpeg_args(format, width, height, fps);
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EncodeError::FfmpegNotFound
                } else {
                    EncodeError::Spawn(e)
                }
            })?;

        let mut stdin = child.stdin.take().ok_or(EncodeError::PipeClosed)?;
        let mut stdout = child.stdout.take().ok_or(EncodeError::PipeClosed)?;

        let (tx, rx) = mpsc::sync_channel::<Vec<u8>>(FRAME_QUEUE_DEPTH);
        let writer = thread::spawn(move || {
            for frame in rx {
                stdin.write_all(&frame)?;
            }
            stdin.flush()
        });
        let reader = thread::spawn(move || {
            let mut bytes = Vec::new();
            stdout.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        log::info!(
            "Recording {}x{} @ {} fps as {}",
            width,
            height,
            fps,
            format.mime_type
        );
        Ok(Self {
            width,
            height,
            child,
            frames: Some(tx),
            writer: Some(writer),
            reader: Some(reader),
            dropped: 0,
        })
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }
}

impl VideoSink for FfmpegVideoSink {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn push_frame(&mut self, rgba: &[u8]) -> Result<(), EncodeError> {
        let expected = (self.width as usize) * (self.height as usize) * 4;
        if rgba.len() != expected {
            return Err(EncodeError::FrameSize {
                expected,
                actual: rgba.len(),
            });
        }
        let tx = self.frames.as_ref().ok_or(EncodeError::PipeClosed)?;
        match tx.try_send(rgba.to_vec()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                log::warn!("Encoder busy, dropped frame ({} total)", self.dropped);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(EncodeError::PipeClosed),
        }
    }

    fn finish(mut self: Box<Self>) -> Result<Vec<u8>, EncodeError> {
        // closing the channel ends the writer, which closes stdin
        self.frames.take();
        if let Some(writer) = self.writer.take() {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("Encoder stdin closed early: {}", e),
                Err(_) => return Err(EncodeError::Failed("writer thread panicked".into())),
            }
        }
        let bytes = match self.reader.take().map(JoinHandle::join) {
            Some(Ok(Ok(bytes))) => bytes,
            Some(Ok(Err(e))) => return Err(EncodeError::Failed(e.to_string())),
            Some(Err(_)) => return Err(EncodeError::Failed("reader thread panicked".into())),
            None => Vec::new(),
        };
        let status = self
            .child
            .wait()
            .map_err(|e| EncodeError::Failed(e.to_string()))?;
        if !status.success() {
            return Err(EncodeError::Failed(format!("ffmpeg exited with {}", status)));
        }
        if self.dropped > 0 {
            log::warn!("Recording dropped {} frame(s)", self.dropped);
        }
        Ok(bytes)
    }
}

impl Drop for FfmpegVideoSink {
    fn drop(&mut self) {
        if self.frames.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Fit an RGBA image into `dst_w × dst_h`, keeping aspect ratio and padding
/// with black. Nearest-neighbour scaling.
pub fn letterbox(src: &[u8], src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Vec<u8> {
    let mut out = vec![0u8; (dst_w as usize) * (dst_h as usize) * 4];
    for px in out.chunks_exact_mut(4) {
        px[3] = 255;
    }
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return out;
    }
    if src_w == dst_w && src_h == dst_h && src.len() == out.len() {
        out.copy_from_slice(src);
        return out;
    }

    let scale = (dst_w as f32 / src_w as f32).min(dst_h as f32 / src_h as f32);
    let fit_w = ((src_w as f32 * scale).round() as u32).clamp(1, dst_w);
    let fit_h = ((src_h as f32 * scale).round() as u32).clamp(1, dst_h);
    let off_x = (dst_w - fit_w) / 2;
    let off_y = (dst_h - fit_h) / 2;

    for y in 0..fit_h {
        let sy = ((y as f32 / scale) as u32).min(src_h - 1);
        for x in 0..fit_w {
            let sx = ((x as f32 / scale) as u32).min(src_w - 1);
            let si = ((sy * src_w + sx) * 4) as usize;
            let di = (((off_y + y) * dst_w + off_x + x) * 4) as usize;
            if si + 4 <= src.len() {
                out[di..di + 4].copy_from_slice(&src[si..si + 4]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::codec::{WEBM_BASELINE, WEBM_VP9};

    #[test]
    fn test_ffmpeg_args_include_encoder_and_size() {
        let args = ffmpeg_args(&WEBM_VP9, 320, 241, 30);
        let joined = args.join(" ");
        assert!(joined.contains("-s 320x241"));
        assert!(joined.contains("-r 30"));
        assert!(joined.contains("-c:v libvpx-vp9"));
        assert!(joined.ends_with("-f webm -"));
    }

    #[test]
    fn test_ffmpeg_args_baseline_uses_default_encoder() {
        let args = ffmpeg_args(&WEBM_BASELINE, 10, 10, 30);
        assert!(!args.iter().any(|a| a == "-c:v"));
    }

    #[test]
    fn test_letterbox_same_size_is_copy() {
        let src: Vec<u8> = (0..16).collect();
        assert_eq!(letterbox(&src, 2, 2, 2, 2), src);
    }

    #[test]
    fn test_letterbox_pads_narrow_source() {
        // 1x2 white into 4x2: scaled to 1x2 and centred
        let src = vec![255u8; 2 * 4];
        let out = letterbox(&src, 1, 2, 4, 2);
        assert_eq!(out.len(), 4 * 2 * 4);
        let px = |x: usize, y: usize| &out[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(px(0, 0), &[0, 0, 0, 255]);
        assert_eq!(px(1, 0), &[255, 255, 255, 255]);
        assert_eq!(px(3, 1), &[0, 0, 0, 255]);
    }

    #[test]
    fn test_letterbox_downscales_large_source() {
        let src = vec![200u8; 8 * 8 * 4];
        let out = letterbox(&src, 8, 8, 4, 2);
        // fits as 2x2 centred at x=1..3
        assert_eq!(&out[4..8], &[200, 200, 200, 200]);
        assert_eq!(&out[0..4], &[0, 0, 0, 255]);
    }
}
