//! Encoder backend selection types.

use serde::{Deserialize, Serialize};

/// The video encoding path used for a rendition.
///
/// Exactly one backend is chosen per job; individual renditions may still be
/// forced onto [`EncoderBackend::Software`] by their [`crate::EncoderPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderBackend {
    /// libx264 on the CPU.
    #[default]
    Software,
    /// Apple VideoToolbox (macOS).
    VideoToolbox,
    /// NVIDIA NVENC.
    Nvenc,
    /// Intel Quick Sync Video.
    Qsv,
    /// VA-API (AMD and Intel on Linux).
    Vaapi,
}

impl EncoderBackend {
    /// All backends in detection priority order, software last.
    pub const ALL: [EncoderBackend; 5] = [
        EncoderBackend::VideoToolbox,
        EncoderBackend::Nvenc,
        EncoderBackend::Qsv,
        EncoderBackend::Vaapi,
        EncoderBackend::Software,
    ];

    /// The ffmpeg encoder name for H.264 on this backend.
    pub fn ffmpeg_encoder(&self) -> &'static str {
        match self {
            EncoderBackend::Software => "libx264",
            EncoderBackend::VideoToolbox => "h264_videotoolbox",
            EncoderBackend::Nvenc => "h264_nvenc",
            EncoderBackend::Qsv => "h264_qsv",
            EncoderBackend::Vaapi => "h264_vaapi",
        }
    }

    /// Short lowercase name, as used in config files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderBackend::Software => "software",
            EncoderBackend::VideoToolbox => "videotoolbox",
            EncoderBackend::Nvenc => "nvenc",
            EncoderBackend::Qsv => "qsv",
            EncoderBackend::Vaapi => "vaapi",
        }
    }
}

impl std::fmt::Display for EncoderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
