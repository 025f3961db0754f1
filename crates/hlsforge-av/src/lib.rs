//! # hlsforge-av
//!
//! Driving ffmpeg and ffprobe for HLS rendition encodes.
//!
//! This crate provides functionality for:
//! - Locating the external tools ([`tools`])
//! - Probing an input for duration and audio presence ([`probe`])
//! - Detecting hardware encoders and picking a backend ([`capability`])
//! - Building, launching and monitoring one rendition encode ([`job`])
//! - Extracting progress from ffmpeg's stderr ([`progress`])
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use hlsforge_av::{probe_media, CapabilityProbe, EncodeSettings, FfmpegCapabilityProbe, RenditionJob};
//! use hlsforge_av::job::{ProgressSink, ProgressUpdate};
//! use hlsforge_common::catalog;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Print;
//! impl ProgressSink for Print {
//!     fn report(&self, rendition: &str, update: ProgressUpdate) {
//!         println!("{rendition}: {update:?}");
//!     }
//! }
//!
//! # async fn example() -> hlsforge_av::Result<()> {
//! let input = Path::new("input/input.mp4");
//! let media = probe_media(Path::new("ffprobe"), input).await?;
//! let backend = FfmpegCapabilityProbe::new("ffmpeg".into()).detect_backend().await;
//!
//! let job = RenditionJob::new(
//!     catalog()[1],
//!     input,
//!     "output",
//!     backend,
//!     media.has_audio,
//!     media.duration,
//!     EncodeSettings::default(),
//! );
//! job.run(Path::new("ffmpeg"), Arc::new(Print), CancellationToken::new(), None).await?;
//! # Ok(())
//! # }
//! ```

mod error;

pub mod capability;
pub mod command;
pub mod job;
pub mod probe;
pub mod progress;
pub mod tools;

// Re-exports
pub use capability::{
    select_backend, CapabilityProbe, EncoderCapabilities, FfmpegCapabilityProbe, Platform,
    StaticCapabilityProbe,
};
pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use job::{EncodeSettings, ProgressSink, ProgressUpdate, RenditionJob};
pub use probe::{probe_media, MediaSummary};
pub use progress::{FfmpegTimeParser, ProgressParser, ProgressSample};
pub use tools::{check_tool_with_arg, check_tools, get_tool_path, require_tool, ToolInfo};
