//! hlsforge-common: shared types, constants, and the rendition catalog.
//!
//! This crate provides the vocabulary used across hlsforge:
//!
//! - **Typed IDs**: [`JobId`], a UUID wrapper identifying one transcode trigger
//! - **Rendition catalog**: the fixed ladder of [`RenditionSpec`] entries
//! - **Encoder backends**: [`EncoderBackend`] and the per-rendition [`EncoderPolicy`]
//! - **Error Handling**: bitrate parse errors
//!
//! # Examples
//!
//! ```
//! use hlsforge_common::{catalog, Bitrate, EncoderBackend};
//!
//! let ladder = catalog();
//! assert_eq!(ladder.len(), 6);
//! assert_eq!(ladder[0].label, "2160p");
//!
//! let bitrate: Bitrate = "6000k".parse().unwrap();
//! assert_eq!(bitrate.bandwidth_bps(), 6_000_000);
//!
//! // Low renditions never use the hardware path.
//! assert_eq!(
//!     ladder[5].effective_backend(EncoderBackend::Nvenc),
//!     EncoderBackend::Software
//! );
//! ```

pub mod encoder;
pub mod error;
pub mod ids;
pub mod rendition;

pub use encoder::EncoderBackend;
pub use error::{Error, Result};
pub use ids::JobId;
pub use rendition::{
    catalog, rendition_by_label, Bitrate, EncoderPolicy, RenditionSpec, Resolution, VARIANT_PLAYLIST,
};
