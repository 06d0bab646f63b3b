//! Time-based cleanup of the clip output directory.
//!
//! Finished clips are only needed long enough for the download that follows;
//! the sweep keeps the directory from growing without bound.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Delete clip files older than `keep_for`.
///
/// Only plain files directly in `dir` are considered; the directory itself
/// and anything nested stays. A missing directory is not an error, it simply
/// holds nothing to evict.
///
/// # Returns
/// The number of files that were removed.
pub async fn evict_stale_clips(dir: &Path, keep_for: Duration) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(_) => continue,
        };
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|t| t.elapsed().ok())
            .unwrap_or(Duration::ZERO);

        if age >= keep_for {
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    tracing::info!(path = %entry.path().display(), "Expired clip removed");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), "Failed to remove clip: {}", e);
                }
            }
        }
    }

    Ok(removed)
}

/// Start the periodic eviction sweep.
///
/// # Arguments
/// * `dir` - The clip output directory.
/// * `keep_for` - How long a finished clip survives.
/// * `interval_secs` - How often to sweep.
///
/// # Returns
/// A join handle for the background task.
pub fn start_eviction_task(
    dir: PathBuf,
    keep_for: Duration,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if let Err(e) = evict_stale_clips(&dir, keep_for).await {
                tracing::warn!(dir = %dir.display(), "Clip eviction sweep failed: {}", e);
            }
        }
    })
}
