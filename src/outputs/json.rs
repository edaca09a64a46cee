//! JSON snapshot of the last build.
//!
//! `build` writes every loaded feed to `{output_dir}/feeds.json`; `search`
//! and `sitemap` read it back instead of hitting the network again.

use crate::models::Snapshot;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument, warn};

pub const SNAPSHOT_FILE: &str = "feeds.json";

pub fn snapshot_path(output_dir: &str) -> PathBuf {
    Path::new(output_dir).join(SNAPSHOT_FILE)
}

/// Write a [`Snapshot`] as pretty JSON into `output_dir`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, feeds = snapshot.feeds.len()))]
pub async fn write_snapshot(snapshot: &Snapshot, output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(snapshot)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = snapshot_path(output_dir);
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote feed snapshot");
    Ok(path)
}

/// Read a snapshot written by [`write_snapshot`].
///
/// A missing file is `None`. An unreadable or corrupt file is logged and
/// also treated as absent.
#[instrument(level = "debug")]
pub async fn read_snapshot(path: &Path) -> Option<Snapshot> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read feed snapshot");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Feed snapshot is corrupt; ignoring it");
            None
        }
    }
}
