//! HLS playlist generation and inspection.

mod master;
mod media;

pub use master::{MasterPlaylist, VariantStream};
pub use media::{MediaPlaylist, SegmentEntry};
