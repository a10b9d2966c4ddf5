//! Operation-level error type for snapshot captures.

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::collect::CollectError;
use crate::fetch::FetchError;

/// Errors that abort a snapshot capture.
///
/// Per-resource download failures are logged and isolated inside the
/// collector; only root-document, workspace, and archive failures surface
/// here. There is no parse variant: parsing is best-effort and cannot fail.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The source URL is invalid, or fetching the root document failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The collector could not set up a tag subdirectory.
    #[error(transparent)]
    Collect(#[from] CollectError),

    /// Creating a directory or writing the rewritten document failed.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Walking or compressing the working directory failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A spawned capture task was cancelled or panicked before finishing.
    #[error("snapshot task interrupted: {reason}")]
    Interrupted {
        /// Why the task never produced a result.
        reason: String,
    },
}

impl SnapshotError {
    /// Creates a filesystem error with path context.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Creates an interrupted-task error.
    pub(crate) fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_display_carries_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = SnapshotError::filesystem("/tmp/work/page.html", source);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/work/page.html"), "Expected path in: {msg}");
    }

    #[test]
    fn test_fetch_errors_pass_through_transparently() {
        let error: SnapshotError = FetchError::http_status("https://example.com", 500).into();
        assert_eq!(error.to_string(), "HTTP 500 fetching https://example.com");
    }
}
