//! hlsforge-media: HLS playlists for the rendition ladder.
//!
//! # Modules
//!
//! - `hls` - master playlist rendering and media playlist inspection
//!
//! The variant playlists and segments themselves are written by ffmpeg; this
//! crate renders the master playlist that ties them together and reads the
//! variant playlists back for reporting.

pub mod error;
pub mod hls;

pub use error::{Error, Result};
pub use hls::{MasterPlaylist, MediaPlaylist, VariantStream};
