//! Progress extraction from ffmpeg's stderr status lines.
//!
//! ffmpeg reports `... time=00:01:02.45 bitrate=...` roughly twice a second.
//! A line is classified as one of three outcomes:
//!
//! - [`ProgressSample::Elapsed`]: the marker matched `HH:MM:SS[.frac]`
//! - [`ProgressSample::Unknown`]: the marker is present but unparsable (`time=N/A`)
//! - [`ProgressSample::NoMarker`]: anything else

use std::sync::LazyLock;

use regex::Regex;

/// Marker token preceding the elapsed timestamp.
pub const TIME_MARKER: &str = "time=";

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("progress regex is a valid literal")
});

/// Result of classifying one stderr line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressSample {
    /// Seconds of output produced so far.
    Elapsed(f64),
    /// The line carries the marker but the value is not a timestamp.
    Unknown,
    /// Not a progress line.
    NoMarker,
}

/// Turns tool diagnostic lines into progress samples.
pub trait ProgressParser: Send + Sync {
    fn parse_line(&self, line: &str) -> ProgressSample;
}

/// Parser for ffmpeg's `time=HH:MM:SS.ff` status format.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegTimeParser;

impl ProgressParser for FfmpegTimeParser {
    fn parse_line(&self, line: &str) -> ProgressSample {
        if !line.contains(TIME_MARKER) {
            return ProgressSample::NoMarker;
        }

        // Take the last match: some builds echo input stats before output stats.
        let elapsed = TIME_RE.captures_iter(line).last().and_then(|caps| {
            let h: f64 = caps.get(1)?.as_str().parse().ok()?;
            let m: f64 = caps.get(2)?.as_str().parse().ok()?;
            let s: f64 = caps.get(3)?.as_str().parse().ok()?;
            Some(h * 3600.0 + m * 60.0 + s)
        });

        match elapsed {
            Some(secs) => ProgressSample::Elapsed(secs),
            None => ProgressSample::Unknown,
        }
    }
}

/// Convert an `HH:MM:SS[.frac]` timestamp to seconds.
///
/// ```
/// use hlsforge_av::progress::timestamp_to_seconds;
///
/// assert_eq!(timestamp_to_seconds("01:02:03.45"), Some(3723.45));
/// assert_eq!(timestamp_to_seconds("N/A"), None);
/// ```
pub fn timestamp_to_seconds(timestamp: &str) -> Option<f64> {
    match FfmpegTimeParser.parse_line(&format!("{TIME_MARKER}{}", timestamp.trim())) {
        ProgressSample::Elapsed(secs) => Some(secs),
        _ => None,
    }
}

/// Percent complete, clamped to `[0, 100]`.
///
/// A non-positive total yields 0.
pub fn percent(elapsed: f64, total: f64) -> f64 {
    if total <= 0.0 || !elapsed.is_finite() {
        return 0.0;
    }
    (elapsed / total * 100.0).clamp(0.0, 100.0)
}
