//! Reading back the per-rendition media playlists ffmpeg writes.

use std::path::Path;

use crate::{Error, Result};

/// A parsed media playlist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaPlaylist {
    /// `#EXT-X-TARGETDURATION`, if present.
    pub target_duration: Option<u32>,
    pub segments: Vec<SegmentEntry>,
    /// Whether `#EXT-X-ENDLIST` was seen.
    pub ended: bool,
}

/// A segment entry in the playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEntry {
    /// Duration in seconds.
    pub duration: f64,
    /// Segment URI.
    pub uri: String,
}

impl MediaPlaylist {
    /// Parse M3U8 text.
    ///
    /// Unknown tags are skipped. A URI line must follow each `#EXTINF`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        if lines.next() != Some("#EXTM3U") {
            return Err(Error::invalid_playlist("missing #EXTM3U header"));
        }

        let mut playlist = MediaPlaylist::default();
        let mut pending_duration: Option<f64> = None;

        for line in lines {
            if let Some(value) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
                playlist.target_duration = Some(value.parse().map_err(|_| {
                    Error::invalid_playlist(format!("bad target duration {value:?}"))
                })?);
            } else if let Some(value) = line.strip_prefix("#EXTINF:") {
                let duration = value.split(',').next().unwrap_or_default();
                pending_duration = Some(duration.parse().map_err(|_| {
                    Error::invalid_playlist(format!("bad segment duration {duration:?}"))
                })?);
            } else if line == "#EXT-X-ENDLIST" {
                playlist.ended = true;
            } else if line.starts_with('#') {
                continue;
            } else {
                let duration = pending_duration.take().ok_or_else(|| {
                    Error::invalid_playlist(format!("URI {line:?} without #EXTINF"))
                })?;
                playlist.segments.push(SegmentEntry {
                    duration,
                    uri: line.to_string(),
                });
            }
        }

        Ok(playlist)
    }

    /// Read and parse a playlist file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Sum of segment durations in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }
}
