//! Hardware encoder detection.
//!
//! Probing produces a typed [`EncoderCapabilities`] set; choosing a backend
//! from that set is the pure function [`select_backend`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use hlsforge_common::EncoderBackend;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::command::ToolCommand;
use crate::tools;

/// Driver utility whose presence gates NVENC.
pub const NVIDIA_DRIVER_TOOL: &str = "nvidia-smi";

/// What the host's ffmpeg build and drivers can do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EncoderCapabilities {
    pub videotoolbox: bool,
    pub nvenc: bool,
    pub qsv: bool,
    pub vaapi: bool,
    /// The NVIDIA driver tool is installed.
    pub nvidia_driver: bool,
}

impl EncoderCapabilities {
    /// Build from the text of `ffmpeg -hide_banner -encoders`.
    pub fn from_encoder_listing(listing: &str, nvidia_driver: bool) -> Self {
        Self {
            videotoolbox: listing.contains(EncoderBackend::VideoToolbox.ffmpeg_encoder()),
            nvenc: listing.contains(EncoderBackend::Nvenc.ffmpeg_encoder()),
            qsv: listing.contains(EncoderBackend::Qsv.ffmpeg_encoder()),
            vaapi: listing.contains(EncoderBackend::Vaapi.ffmpeg_encoder()),
            nvidia_driver,
        }
    }

    /// Whether ffmpeg lists the encoder for `backend`.
    pub fn lists(&self, backend: EncoderBackend) -> bool {
        match backend {
            EncoderBackend::Software => true,
            EncoderBackend::VideoToolbox => self.videotoolbox,
            EncoderBackend::Nvenc => self.nvenc,
            EncoderBackend::Qsv => self.qsv,
            EncoderBackend::Vaapi => self.vaapi,
        }
    }
}

/// Host platform family, as far as encoder selection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Platform {
    MacOs,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }
}

/// Choose the backend for a job from probed capabilities.
///
/// On macOS only VideoToolbox is considered. Elsewhere the order is NVENC
/// (which also needs the driver tool), QSV, VAAPI, then software.
pub fn select_backend(caps: &EncoderCapabilities, platform: Platform) -> EncoderBackend {
    match platform {
        Platform::MacOs if caps.videotoolbox => EncoderBackend::VideoToolbox,
        Platform::MacOs => EncoderBackend::Software,
        Platform::Other if caps.nvidia_driver && caps.nvenc => EncoderBackend::Nvenc,
        Platform::Other if caps.qsv => EncoderBackend::Qsv,
        Platform::Other if caps.vaapi => EncoderBackend::Vaapi,
        Platform::Other => EncoderBackend::Software,
    }
}

/// Source of encoder capabilities.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    /// Capabilities of this host. Implementations may cache.
    async fn capabilities(&self) -> EncoderCapabilities;

    fn platform(&self) -> Platform {
        Platform::current()
    }

    /// Probe and select in one step.
    async fn detect_backend(&self) -> EncoderBackend {
        let caps = self.capabilities().await;
        let backend = select_backend(&caps, self.platform());
        tracing::debug!(?caps, %backend, "Selected encoder backend");
        backend
    }
}

/// Probes the real ffmpeg once and caches the answer.
#[derive(Debug)]
pub struct FfmpegCapabilityProbe {
    ffmpeg: PathBuf,
    cache: OnceCell<EncoderCapabilities>,
}

impl FfmpegCapabilityProbe {
    pub fn new(ffmpeg: PathBuf) -> Self {
        Self {
            ffmpeg,
            cache: OnceCell::new(),
        }
    }

    async fn probe(&self) -> EncoderCapabilities {
        let nvidia_driver = tools::on_path(NVIDIA_DRIVER_TOOL);

        let listing = match ToolCommand::new(self.ffmpeg.clone())
            .args(["-hide_banner", "-encoders"])
            .timeout(Duration::from_secs(15))
            .execute()
            .await
        {
            Ok(output) => format!("{}{}", output.stdout, output.stderr),
            Err(e) => {
                tracing::warn!("Could not list ffmpeg encoders, using software: {}", e);
                String::new()
            }
        };

        EncoderCapabilities::from_encoder_listing(&listing, nvidia_driver)
    }
}

#[async_trait]
impl CapabilityProbe for FfmpegCapabilityProbe {
    async fn capabilities(&self) -> EncoderCapabilities {
        *self.cache.get_or_init(|| self.probe()).await
    }
}

/// Fixed capabilities, for hosts where detection is unwanted and for tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticCapabilityProbe {
    pub caps: EncoderCapabilities,
    pub platform: Platform,
}

impl StaticCapabilityProbe {
    /// A probe that reports exactly the given backend as available.
    pub fn only(backend: EncoderBackend) -> Self {
        let mut caps = EncoderCapabilities::default();
        let platform = match backend {
            EncoderBackend::VideoToolbox => {
                caps.videotoolbox = true;
                Platform::MacOs
            }
            EncoderBackend::Nvenc => {
                caps.nvenc = true;
                caps.nvidia_driver = true;
                Platform::Other
            }
            EncoderBackend::Qsv => {
                caps.qsv = true;
                Platform::Other
            }
            EncoderBackend::Vaapi => {
                caps.vaapi = true;
                Platform::Other
            }
            EncoderBackend::Software => Platform::Other,
        };
        Self { caps, platform }
    }
}

#[async_trait]
impl CapabilityProbe for StaticCapabilityProbe {
    async fn capabilities(&self) -> EncoderCapabilities {
        self.caps
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}
