//! Common error types used throughout hlsforge.

/// Errors raised while parsing shared value types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A bitrate string such as `6000k` could not be parsed.
    #[error("Invalid bitrate: {0}")]
    InvalidBitrate(String),
}

impl Error {
    /// Create a new InvalidBitrate error.
    pub fn invalid_bitrate<S: Into<String>>(msg: S) -> Self {
        Self::InvalidBitrate(msg.into())
    }
}

/// Result type alias using the common error type.
pub type Result<T> = std::result::Result<T, Error>;
