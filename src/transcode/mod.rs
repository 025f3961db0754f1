//! The transcode pipeline: input resolution, parallel rendition encodes and
//! the master playlist.

mod input;
mod manifest;
mod orchestrator;

pub use input::{explicit_input, resolve_input};
pub use manifest::write_manifest;
pub use orchestrator::{RenditionOutcome, TranscodeOutcome, Transcoder};
