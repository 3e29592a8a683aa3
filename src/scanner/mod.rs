//! Stability scan of the pending directory.
//!
//! Recordings arrive through a file-sync client that creates the file
//! before it has finished writing it. A file is only picked up once its
//! size is unchanged across a short settle window and non-zero, so a
//! half-synced recording is never fed to the engine.

use crate::config::has_allowed_extension;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// One audio file selected for transcription.
#[derive(Debug, Clone)]
pub struct AudioItem {
    /// Absolute path of the source file
    pub path: PathBuf,
    /// File name including extension
    pub name: String,
    /// Size in bytes at scan time
    pub size: u64,
}

/// List audio files in `dir` whose size is stable across `settle`.
///
/// Non-recursive; extensions are matched case-insensitively against the
/// allow-list. Files that grow, are empty, or disappear between the two
/// samples are skipped without error. The result is sorted by file name
/// so repeated runs process items in the same order.
pub async fn scan_stable(dir: &Path, settle: Duration) -> Result<Vec<AudioItem>> {
    let mut candidates = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !has_allowed_extension(&path) {
            continue;
        }
        if let Ok(meta) = entry.metadata().await {
            if meta.is_file() {
                candidates.push((path, meta.len()));
            }
        }
    }

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    tokio::time::sleep(settle).await;

    let mut stable = Vec::new();
    for (path, first_size) in candidates {
        // The file may have been moved or deleted during the settle wait
        let second_size = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(_) => continue,
        };

        if first_size == second_size && first_size > 0 {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            stable.push(AudioItem {
                path,
                name,
                size: first_size,
            });
        } else {
            debug!(
                "Skipping unstable file {} ({} -> {} bytes)",
                path.display(),
                first_size,
                second_size
            );
        }
    }

    stable.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(stable)
}
