//! Working-directory lifecycle for snapshot captures.

use std::path::Path;

use tracing::debug;

use super::SnapshotError;

/// Creates the working directory (and any missing parents) for a capture.
pub(crate) async fn create_working_dir(path: &Path) -> Result<(), SnapshotError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| SnapshotError::filesystem(path, source))
}

/// Recursively removes a capture's working directory.
///
/// The caller invokes this exactly once per successful capture, after the
/// archive has been consumed (sent or copied), never before. The archive
/// itself is never touched; its ownership transferred to the caller when
/// the capture returned.
///
/// # Errors
///
/// Returns [`SnapshotError::Filesystem`] when deletion fails.
pub async fn remove_working_dir(path: &Path) -> Result<(), SnapshotError> {
    debug!(path = %path.display(), "removing working directory");
    tokio::fs::remove_dir_all(path)
        .await
        .map_err(|source| SnapshotError::filesystem(path, source))
}
