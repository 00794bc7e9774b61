use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;
use vods_engine::RecoveredPlaylist;

use crate::error::Result;

/// Compact `1h2m3s` rendering, truncated to whole seconds.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// `<output_dir>/<streamer>/<metadata>_<duration>.m3u8`
pub fn playlist_path(output_dir: &Path, recovered: &RecoveredPlaylist) -> PathBuf {
    let file_name = format!(
        "{}_{}.m3u8",
        recovered.metadata,
        format_duration(recovered.playlist.total_duration())
    );
    output_dir
        .join(&recovered.metadata.streamer_name)
        .join(file_name)
}

pub async fn write_playlist(output_dir: &Path, recovered: &RecoveredPlaylist) -> Result<PathBuf> {
    let path = playlist_path(output_dir, recovered);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let encoded = recovered.playlist.encode()?;
    tokio::fs::write(&path, &encoded).await?;
    info!(
        path = %path.display(),
        segments = recovered.playlist.len(),
        "Playlist written"
    );
    Ok(path)
}
