use hlsforge_common::RenditionSpec;
use hlsforge_media::MasterPlaylist;
use std::path::Path;

/// Write the master playlist for `renditions`, creating the parent directory.
pub async fn write_manifest<'a>(
    path: &Path,
    renditions: impl IntoIterator<Item = &'a RenditionSpec>,
) -> std::io::Result<()> {
    let playlist = MasterPlaylist::from_renditions(renditions);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, playlist.render()).await?;

    tracing::info!(
        "Master playlist written to {} ({} variants)",
        path.display(),
        playlist.streams.len()
    );
    Ok(())
}
