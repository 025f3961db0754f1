//! The fixed rendition ladder.
//!
//! Every transcode produces exactly the six renditions in [`catalog`], from
//! the highest to the lowest resolution. The catalog is immutable for the
//! life of the process.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{EncoderBackend, Error, Result};

/// File name of each rendition's variant playlist, inside its output directory.
pub const VARIANT_PLAYLIST: &str = "prog.m3u8";

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The `W:H` form used by ffmpeg's `scale` filter.
    pub fn scale_arg(&self) -> String {
        format!("{}:{}", self.width, self.height)
    }
}

/// Renders as `WxH`, the form used in HLS `RESOLUTION` attributes.
impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A bitrate, kept in bits per second.
///
/// Parses and prints the ffmpeg shorthand (`6000k`, `2M`, `128000`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bitrate(u64);

impl Bitrate {
    pub const fn from_kbps(kbps: u64) -> Self {
        Self(kbps * 1000)
    }

    pub const fn from_bps(bps: u64) -> Self {
        Self(bps)
    }

    /// The bitrate expressed in raw bits per second, as advertised in a
    /// master playlist's `BANDWIDTH` attribute.
    pub fn bandwidth_bps(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Bitrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 != 0 && self.0 % 1000 == 0 {
            write!(f, "{}k", self.0 / 1000)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl std::str::FromStr for Bitrate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (digits, multiplier) = match trimmed.char_indices().last() {
            Some((idx, 'k' | 'K')) => (&trimmed[..idx], 1_000),
            Some((idx, 'm' | 'M')) => (&trimmed[..idx], 1_000_000),
            Some(_) => (trimmed, 1),
            None => return Err(Error::invalid_bitrate(s)),
        };
        let value: u64 = digits.parse().map_err(|_| Error::invalid_bitrate(s))?;
        if value == 0 {
            return Err(Error::invalid_bitrate(s));
        }
        let bps = value
            .checked_mul(multiplier)
            .ok_or_else(|| Error::invalid_bitrate(s))?;
        Ok(Self(bps))
    }
}

impl TryFrom<String> for Bitrate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Bitrate> for String {
    fn from(value: Bitrate) -> Self {
        value.to_string()
    }
}

/// Which encoder a rendition may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderPolicy {
    /// Use whatever backend was detected for the job.
    Detected,
    /// Always encode in software, regardless of the detected backend.
    ForceSoftware,
}

/// One entry of the rendition ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenditionSpec {
    /// Label, also the name of the rendition's output directory.
    pub label: &'static str,
    pub resolution: Resolution,
    pub bitrate: Bitrate,
    pub encoder_policy: EncoderPolicy,
}

impl RenditionSpec {
    /// Directory holding this rendition's playlist and segments.
    pub fn output_dir(&self, output_root: &Path) -> PathBuf {
        output_root.join(self.label)
    }

    /// Variant playlist URI relative to the output root: `<label>/prog.m3u8`.
    pub fn playlist_uri(&self) -> String {
        format!("{}/{}", self.label, VARIANT_PLAYLIST)
    }

    /// The backend this rendition actually encodes with.
    pub fn effective_backend(&self, detected: EncoderBackend) -> EncoderBackend {
        match self.encoder_policy {
            EncoderPolicy::Detected => detected,
            EncoderPolicy::ForceSoftware => EncoderBackend::Software,
        }
    }
}

const CATALOG: [RenditionSpec; 6] = [
    RenditionSpec {
        label: "2160p",
        resolution: Resolution::new(3840, 2160),
        bitrate: Bitrate::from_kbps(14000),
        encoder_policy: EncoderPolicy::Detected,
    },
    RenditionSpec {
        label: "1080p",
        resolution: Resolution::new(1920, 1080),
        bitrate: Bitrate::from_kbps(6000),
        encoder_policy: EncoderPolicy::Detected,
    },
    RenditionSpec {
        label: "720p",
        resolution: Resolution::new(1280, 720),
        bitrate: Bitrate::from_kbps(3000),
        encoder_policy: EncoderPolicy::Detected,
    },
    RenditionSpec {
        label: "480p",
        resolution: Resolution::new(854, 480),
        bitrate: Bitrate::from_kbps(1000),
        encoder_policy: EncoderPolicy::Detected,
    },
    RenditionSpec {
        label: "360p",
        resolution: Resolution::new(640, 360),
        bitrate: Bitrate::from_kbps(600),
        encoder_policy: EncoderPolicy::ForceSoftware,
    },
    RenditionSpec {
        label: "180p",
        resolution: Resolution::new(320, 180),
        bitrate: Bitrate::from_kbps(300),
        encoder_policy: EncoderPolicy::ForceSoftware,
    },
];

/// The rendition ladder, highest resolution first.
pub fn catalog() -> &'static [RenditionSpec] {
    &CATALOG
}

/// Look up a catalog entry by label.
pub fn rendition_by_label(label: &str) -> Option<&'static RenditionSpec> {
    CATALOG.iter().find(|r| r.label == label)
}
