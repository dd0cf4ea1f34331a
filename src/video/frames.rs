//! Frame extraction: `ffprobe` for duration, `ffmpeg` for single JPEG frames.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Source of still frames from one video.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    /// Length of the video in seconds.
    async fn duration(&self) -> Result<f64>;
    /// Encoded image of the frame nearest `timestamp` seconds.
    async fn frame_at(&self, timestamp: f64) -> Result<Vec<u8>>;
}

/// Frames pulled through the `ffmpeg` binaries on `PATH`.
///
/// Built from bytes, it owns a temporary copy of the video that is removed
/// when the source is dropped.
#[derive(Debug)]
pub struct FfmpegFrameSource {
    path: PathBuf,
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    temp_copy: bool,
}

impl FfmpegFrameSource {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let ffmpeg = which::which("ffmpeg").map_err(|e| Error::Media(format!("ffmpeg not found: {}", e)))?;
        let ffprobe = which::which("ffprobe").map_err(|e| Error::Media(format!("ffprobe not found: {}", e)))?;
        Ok(Self {
            path: path.into(),
            ffmpeg,
            ffprobe,
            temp_copy: false,
        })
    }

    /// Write `bytes` to a temp file and open it.
    pub fn from_bytes(bytes: &[u8], extension: &str) -> Result<Self> {
        let path = std::env::temp_dir().join(format!(
            "hanzi-snap-{}.{}",
            uuid::Uuid::new_v4(),
            extension.trim_start_matches('.')
        ));
        std::fs::write(&path, bytes)?;
        log::debug!("[VIDEO] Wrote temp copy {} ({} bytes)", path.display(), bytes.len());
        match Self::open(&path) {
            Ok(mut source) => {
                source.temp_copy = true;
                Ok(source)
            }
            Err(e) => {
                let _ = std::fs::remove_file(&path);
                Err(e)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run(&self, program: &Path, args: &[&str]) -> Result<Vec<u8>> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Media(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                crate::error::truncate(stderr.trim(), 300)
            )));
        }
        Ok(output.stdout)
    }
}

impl FrameSource for FfmpegFrameSource {
    async fn duration(&self) -> Result<f64> {
        let path = self.path.to_string_lossy();
        let stdout = self
            .run(
                &self.ffprobe,
                &["-v", "error", "-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1", &path],
            )
            .await?;
        parse_duration(&String::from_utf8_lossy(&stdout))
    }

    async fn frame_at(&self, timestamp: f64) -> Result<Vec<u8>> {
        let path = self.path.to_string_lossy();
        let seek = format!("{:.3}", timestamp.max(0.0));
        let jpeg = self
            .run(
                &self.ffmpeg,
                &[
                    "-v", "error", "-ss", &seek, "-i", &path, "-frames:v", "1", "-f", "image2pipe", "-vcodec", "mjpeg", "-",
                ],
            )
            .await?;
        if jpeg.is_empty() {
            return Err(Error::Media(format!("no frame at {}s", seek)));
        }
        Ok(jpeg)
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if self.temp_copy {
            match std::fs::remove_file(&self.path) {
                Ok(()) => log::debug!("[VIDEO] Removed temp copy {}", self.path.display()),
                Err(e) => log::warn!("[VIDEO] Failed to remove temp copy {}: {}", self.path.display(), e),
            }
        }
    }
}

/// Parse `ffprobe` duration output (seconds, possibly `N/A`).
pub fn parse_duration(output: &str) -> Result<f64> {
    let value = output.trim();
    match value.parse::<f64>() {
        Ok(d) if d.is_finite() && d >= 0.0 => Ok(d),
        _ => Err(Error::Media(format!("unreadable duration: {:?}", value))),
    }
}
