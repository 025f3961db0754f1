//! Master (multivariant) playlist.

use std::fmt::Write;

use hlsforge_common::{RenditionSpec, Resolution};

/// Master playlist listing every rendition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterPlaylist {
    /// Stream variants, in the order they are advertised.
    pub streams: Vec<VariantStream>,
}

impl MasterPlaylist {
    /// One variant per rendition, preserving order.
    ///
    /// URIs are relative to the master playlist: `<label>/prog.m3u8`.
    pub fn from_renditions<'a>(renditions: impl IntoIterator<Item = &'a RenditionSpec>) -> Self {
        let streams = renditions
            .into_iter()
            .map(|r| VariantStream {
                uri: r.playlist_uri(),
                bandwidth: r.bitrate.bandwidth_bps(),
                resolution: r.resolution,
            })
            .collect();
        Self { streams }
    }

    /// Render to M3U8 text.
    pub fn render(&self) -> String {
        let mut out = String::from("#EXTM3U\n");

        for stream in &self.streams {
            // Writing to a String cannot fail.
            let _ = writeln!(
                out,
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}",
                stream.bandwidth, stream.resolution
            );
            out.push_str(&stream.uri);
            out.push('\n');
        }

        out
    }
}

/// One `#EXT-X-STREAM-INF` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStream {
    /// Playlist URI.
    pub uri: String,
    /// Peak bandwidth in bits per second.
    pub bandwidth: u64,
    pub resolution: Resolution,
}
