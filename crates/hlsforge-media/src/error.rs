//! Error types for hlsforge-media.

use std::io;
use thiserror::Error;

/// Result type for hlsforge-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for hlsforge-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Text that is not a well-formed playlist.
    #[error("Invalid playlist: {0}")]
    InvalidPlaylist(String),
}

impl Error {
    /// Create an invalid playlist error.
    pub fn invalid_playlist(msg: impl Into<String>) -> Self {
        Self::InvalidPlaylist(msg.into())
    }
}
