//! Unified error type for hlsforge.
//!
//! Transcode failures funnel into [`Error`], which carries enough context for
//! HTTP handlers to derive a status code via [`Error::http_status`].

use std::fmt;
use std::path::PathBuf;

/// Errors surfaced by the transcode service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// None of the configured input candidates exist.
    #[error("No input file found (checked: {})", format_paths(.candidates))]
    InputNotFound {
        /// The candidate paths that were checked.
        candidates: Vec<PathBuf>,
    },

    /// The input could not be probed for its duration.
    #[error("Probe error: {0}")]
    Probe(String),

    /// An external tool returned an error outside of a rendition job.
    #[error("Tool error [{tool}]: {message}")]
    Tool { tool: String, message: String },

    /// A transcode is already running.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Map this error to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InputNotFound { .. } => 500,
            Error::Probe(_) => 500,
            Error::Tool { .. } => 500,
            Error::Conflict(_) => 409,
            Error::NotFound { .. } => 404,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InputNotFound { .. } => "input_not_found",
            Error::Probe(_) => "probe_error",
            Error::Tool { .. } => "tool_error",
            Error::Conflict(_) => "conflict",
            Error::NotFound { .. } => "not_found",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Tool errors from the probe stage become probe errors; the rest keep their kind.
impl From<hlsforge_av::Error> for Error {
    fn from(e: hlsforge_av::Error) -> Self {
        match e {
            hlsforge_av::Error::ToolNotFound { tool } => {
                Error::tool(tool, "not found on PATH")
            }
            hlsforge_av::Error::Io(source) => Error::Io { source },
            other => Error::Probe(other.to_string()),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
