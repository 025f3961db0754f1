//! One rendition encode: argument construction, launch and live monitoring.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use hlsforge_common::{Bitrate, EncoderBackend, RenditionSpec, VARIANT_PLAYLIST};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::progress::{self, FfmpegTimeParser, ProgressParser, ProgressSample};
use crate::{Error, Result};

/// Segment file pattern inside each rendition directory.
pub const SEGMENT_PATTERN: &str = "file_%03d.ts";

/// Default VAAPI render node.
pub const DEFAULT_VAAPI_DEVICE: &str = "/dev/dri/renderD128";

/// Number of trailing stderr lines kept for failure messages.
const STDERR_TAIL_LINES: usize = 8;

/// Encode parameters shared by every rendition of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub segment_seconds: u32,
    pub audio_bitrate: Bitrate,
    pub vaapi_device: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            segment_seconds: 6,
            audio_bitrate: Bitrate::from_kbps(128),
            vaapi_device: DEFAULT_VAAPI_DEVICE.to_string(),
        }
    }
}

/// A progress report from a running encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressUpdate {
    /// Percent complete in `[0, 100]`.
    Percent(f64),
    /// ffmpeg reported a time it could not express.
    Unknown,
}

/// Receives live progress from running rendition jobs.
pub trait ProgressSink: Send + Sync {
    fn report(&self, rendition: &str, update: ProgressUpdate);
}

/// Everything needed to run ffmpeg for one rendition.
#[derive(Clone)]
pub struct RenditionJob {
    pub rendition: RenditionSpec,
    pub input: PathBuf,
    pub output_root: PathBuf,
    /// Backend after applying the rendition's encoder policy.
    pub backend: EncoderBackend,
    pub include_audio: bool,
    /// Input duration in seconds.
    pub total_duration: f64,
    pub settings: EncodeSettings,
    parser: Arc<dyn ProgressParser>,
}

impl std::fmt::Debug for RenditionJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenditionJob")
            .field("rendition", &self.rendition.label)
            .field("input", &self.input)
            .field("backend", &self.backend)
            .field("include_audio", &self.include_audio)
            .field("total_duration", &self.total_duration)
            .finish()
    }
}

impl RenditionJob {
    /// Build a job, resolving the detected backend through the rendition's policy.
    pub fn new(
        rendition: RenditionSpec,
        input: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        detected: EncoderBackend,
        include_audio: bool,
        total_duration: f64,
        settings: EncodeSettings,
    ) -> Self {
        Self {
            backend: rendition.effective_backend(detected),
            rendition,
            input: input.into(),
            output_root: output_root.into(),
            include_audio,
            total_duration,
            settings,
            parser: Arc::new(FfmpegTimeParser),
        }
    }

    /// Replace the stderr progress parser.
    pub fn with_parser(mut self, parser: Arc<dyn ProgressParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn label(&self) -> &'static str {
        self.rendition.label
    }

    pub fn output_dir(&self) -> PathBuf {
        self.rendition.output_dir(&self.output_root)
    }

    pub fn playlist_path(&self) -> PathBuf {
        self.output_dir().join(VARIANT_PLAYLIST)
    }

    /// Full ffmpeg argument list, program name excluded.
    pub fn build_args(&self) -> Vec<String> {
        let dir = self.output_dir();
        let res = self.rendition.resolution;
        let bitrate = self.rendition.bitrate.to_string();

        let mut args: Vec<String> = vec![
            "-y".into(),
            "-i".into(),
            self.input.to_string_lossy().into_owned(),
        ];

        match self.backend {
            EncoderBackend::Vaapi => {
                args.extend([
                    "-vaapi_device".into(),
                    self.settings.vaapi_device.clone(),
                    "-vf".into(),
                    format!(
                        "format=nv12,hwupload,scale_vaapi=w={}:h={}",
                        res.width, res.height
                    ),
                ]);
            }
            EncoderBackend::Software
            | EncoderBackend::VideoToolbox
            | EncoderBackend::Nvenc
            | EncoderBackend::Qsv => {
                args.extend(["-vf".into(), format!("scale={}", res.scale_arg())]);
            }
        }
        args.extend([
            "-c:v".into(),
            self.backend.ffmpeg_encoder().into(),
            "-b:v".into(),
            bitrate,
        ]);

        if self.include_audio {
            args.extend([
                "-c:a".into(),
                "aac".into(),
                "-b:a".into(),
                self.settings.audio_bitrate.to_string(),
            ]);
        } else {
            args.push("-an".into());
        }

        args.extend([
            "-f".into(),
            "hls".into(),
            "-hls_time".into(),
            self.settings.segment_seconds.to_string(),
            "-hls_list_size".into(),
            "0".into(),
            "-hls_segment_filename".into(),
            dir.join(SEGMENT_PATTERN).to_string_lossy().into_owned(),
            self.playlist_path().to_string_lossy().into_owned(),
        ]);

        args
    }

    /// Run ffmpeg to completion, streaming progress into `sink`.
    ///
    /// Returns once the process has exited and its stderr has been drained.
    /// The process is killed if `cancel` fires or `timeout` elapses.
    pub async fn run(
        &self,
        ffmpeg: &Path,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let label = self.label();
        tokio::fs::create_dir_all(self.output_dir()).await?;

        let args = self.build_args();
        tracing::debug!(rendition = label, encoder = %self.backend, "ffmpeg {}", args.join(" "));

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool_failed("ffmpeg", format!("failed to spawn: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::tool_failed("ffmpeg", "stderr was not captured"))?;

        let reader = tokio::spawn(forward_progress(
            stderr,
            Arc::clone(&self.parser),
            sink,
            label,
            self.total_duration,
        ));

        let deadline = async {
            match timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            status = child.wait() => Ok(status?),
            _ = cancel.cancelled() => Err(Error::Cancelled { tool: "ffmpeg".into() }),
            _ = deadline => Err(Error::Timeout {
                tool: "ffmpeg".into(),
                after: timeout.unwrap_or_default(),
            }),
        };

        if outcome.is_err() {
            if let Err(e) = child.kill().await {
                tracing::warn!(rendition = label, "Failed to kill ffmpeg: {}", e);
            }
        }

        // Killing closes the pipe, so the reader always finishes.
        let tail = match reader.await {
            Ok(tail) => tail,
            // A panicking parser or sink fails the whole rendition.
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                tracing::warn!(rendition = label, "stderr reader ended abnormally: {}", e);
                Vec::new()
            }
        };

        let status = outcome?;
        if !status.success() {
            return Err(Error::tool_failed(
                "ffmpeg",
                format!("exited with status {}: {}", status, tail.join(" | ")),
            ));
        }

        Ok(())
    }
}

/// Drain ffmpeg's stderr, publishing progress as status lines arrive.
///
/// Returns the last few non-progress lines for error reporting.
async fn forward_progress<R>(
    stderr: R,
    parser: Arc<dyn ProgressParser>,
    sink: Arc<dyn ProgressSink>,
    label: &'static str,
    total_duration: f64,
) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

    let result = read_status_lines(stderr, |line| match parser.parse_line(line) {
        ProgressSample::Elapsed(secs) => {
            let pct = progress::percent(secs, total_duration);
            tracing::trace!(rendition = label, percent = pct, "progress");
            sink.report(label, ProgressUpdate::Percent(pct));
        }
        ProgressSample::Unknown => sink.report(label, ProgressUpdate::Unknown),
        ProgressSample::NoMarker => {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return;
            }
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(trimmed.to_string());
        }
    })
    .await;

    if let Err(e) = result {
        tracing::warn!(rendition = label, "Error reading ffmpeg stderr: {}", e);
    }

    tail.into()
}

/// Split a byte stream into lines on `\n` or `\r`.
///
/// ffmpeg rewrites its status line in place with bare carriage returns, so
/// both terminators count. Invalid UTF-8 is replaced lossily.
pub async fn read_status_lines<R, F>(mut reader: R, mut on_line: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut buf = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }

        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    on_line(&String::from_utf8_lossy(&pending));
                    pending.clear();
                }
            } else {
                pending.push(byte);
            }
        }
    }

    if !pending.is_empty() {
        on_line(&String::from_utf8_lossy(&pending));
    }

    Ok(())
}
