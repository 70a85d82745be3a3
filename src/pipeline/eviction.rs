//! Best-effort removal of audio files whose entries left the store

use std::io::ErrorKind;
use std::path::Path;

/// Delete each file, logging failures; returns how many were deleted
///
/// A file that is already gone counts as deleted. The store is authoritative,
/// so nothing here is ever reported as an error.
pub async fn delete_files(paths: &[String]) -> usize {
    let mut deleted = 0;
    for path in paths {
        if delete_file(Path::new(path)).await {
            deleted += 1;
        }
    }

    if !paths.is_empty() {
        tracing::info!(requested = paths.len(), deleted, "Removed evicted audio files");
    }
    deleted
}

/// Delete one file; `true` when it no longer exists afterwards
pub(crate) async fn delete_file(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return true;
    }

    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Deleted audio file");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Audio file already gone");
            true
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete audio file");
            false
        }
    }
}
