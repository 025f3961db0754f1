//! ffprobe queries for duration and audio presence.

use std::path::Path;

use crate::command::ToolCommand;
use crate::{Error, Result};

/// What a transcode needs to know about its input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaSummary {
    /// Container duration in seconds, always positive.
    pub duration: f64,
    pub has_audio: bool,
}

/// Probe duration and audio presence.
///
/// A failed duration probe is an error; a failed audio probe is logged and
/// reported as "no audio".
pub async fn probe_media(ffprobe: &Path, input: &Path) -> Result<MediaSummary> {
    if !input.exists() {
        return Err(Error::file_not_found(input));
    }

    let duration = probe_duration(ffprobe, input).await?;
    let has_audio = probe_has_audio(ffprobe, input).await;

    Ok(MediaSummary {
        duration,
        has_audio,
    })
}

/// Total container duration in seconds.
pub async fn probe_duration(ffprobe: &Path, input: &Path) -> Result<f64> {
    let output = ToolCommand::new(ffprobe.to_path_buf())
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input.to_string_lossy())
        .execute()
        .await?;

    parse_duration(&output.stdout)
}

/// Whether the input carries at least one audio stream.
pub async fn probe_has_audio(ffprobe: &Path, input: &Path) -> bool {
    let result = ToolCommand::new(ffprobe.to_path_buf())
        .args([
            "-v",
            "error",
            "-select_streams",
            "a",
            "-show_entries",
            "stream=index",
            "-of",
            "csv=p=0",
        ])
        .arg(input.to_string_lossy())
        .execute()
        .await;

    match result {
        Ok(output) => !output.stdout.trim().is_empty(),
        Err(e) => {
            tracing::warn!("Audio probe failed for {}, assuming no audio: {}", input.display(), e);
            false
        }
    }
}

/// Parse ffprobe's bare `format=duration` output.
pub fn parse_duration(stdout: &str) -> Result<f64> {
    let text = stdout.trim();
    let duration: f64 = text
        .parse()
        .map_err(|_| Error::parse_error("ffprobe", format!("invalid duration {text:?}")))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(Error::parse_error(
            "ffprobe",
            format!("non-positive duration {duration}"),
        ));
    }

    Ok(duration)
}
