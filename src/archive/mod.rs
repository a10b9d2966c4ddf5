//! Zip packaging of a snapshot working directory.
//!
//! The archiver walks the working directory recursively and stores every
//! file under its working-dir-relative path, so the archive reproduces the
//! tree exactly: `page.html` at the root, resources under their tag
//! subdirectories. Compression runs on a blocking thread; the async
//! scheduler is never tied up by CPU-bound work.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{info, instrument};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Errors that can occur packaging a working directory.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading a working-directory file or creating the archive failed.
    #[error("IO error archiving {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Walking the working directory failed.
    #[error("failed to walk working directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// The zip encoder rejected an entry or could not finish the archive.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The blocking archive task was cancelled or panicked.
    #[error("archive task interrupted")]
    Interrupted,
}

impl ArchiveError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[allow(clippy::expect_used)]
static NON_WORD_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("static regex must compile"));

/// Deterministic archive filename for a source URL: every run of non-word
/// characters collapses to `_`.
#[must_use]
pub fn archive_name(source_url: &str) -> String {
    format!("Smart_Tool_{}.zip", NON_WORD_RUNS.replace_all(source_url, "_"))
}

/// Packages every file under `working_dir` into one deflate-compressed zip
/// in `archive_dir` and returns the archive's path.
///
/// Entry names are relative to `working_dir`. The archive belongs to the
/// caller once written; cleanup of the working directory never touches it.
///
/// # Errors
///
/// Returns [`ArchiveError`] when the walk, a file read, or the zip write
/// fails. Any such failure aborts the capture.
#[instrument(skip_all, fields(working_dir = %working_dir.display()))]
pub async fn write_archive(
    working_dir: &Path,
    source_url: &str,
    archive_dir: &Path,
) -> Result<PathBuf, ArchiveError> {
    let archive_path = archive_dir.join(archive_name(source_url));
    let root = working_dir.to_path_buf();
    let target = archive_path.clone();
    tokio::task::spawn_blocking(move || pack(&root, &target))
        .await
        .map_err(|_| ArchiveError::Interrupted)??;
    info!(path = %archive_path.display(), "archive written");
    Ok(archive_path)
}

fn pack(working_dir: &Path, archive_path: &Path) -> Result<(), ArchiveError> {
    let file =
        File::create(archive_path).map_err(|source| ArchiveError::io(archive_path, source))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(working_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        // Walked paths always live under the walk root.
        let Ok(relative) = entry.path().strip_prefix(working_dir) else {
            continue;
        };
        let name = relative.to_string_lossy().replace('\\', "/");
        writer.start_file(name, options)?;
        let mut source =
            File::open(entry.path()).map_err(|source| ArchiveError::io(entry.path(), source))?;
        std::io::copy(&mut source, &mut writer)
            .map_err(|source| ArchiveError::io(entry.path(), source))?;
    }

    writer.finish()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Read;

    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_archive_name_collapses_non_word_runs() {
        assert_eq!(
            archive_name("https://example.com/page"),
            "Smart_Tool_https_example_com_page.zip"
        );
    }

    #[test]
    fn test_archive_name_is_deterministic() {
        assert_eq!(
            archive_name("https://example.com"),
            archive_name("https://example.com")
        );
    }

    #[tokio::test]
    async fn test_write_archive_preserves_tree_relative_paths() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        std::fs::write(work.path().join("page.html"), b"<html></html>").unwrap();
        std::fs::create_dir_all(work.path().join("link")).unwrap();
        std::fs::write(work.path().join("link/site.css"), b"body{}").unwrap();
        std::fs::create_dir_all(work.path().join("script")).unwrap();
        std::fs::write(work.path().join("script/app.js"), b"run()").unwrap();

        let archive_path = write_archive(work.path(), "https://example.com", out.path())
            .await
            .unwrap();
        assert!(archive_path.starts_with(out.path()));
        assert_eq!(
            archive_path.file_name().unwrap().to_str().unwrap(),
            "Smart_Tool_https_example_com.zip"
        );

        let mut archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 3);
        for (name, expected) in [
            ("page.html", b"<html></html>".as_slice()),
            ("link/site.css", b"body{}".as_slice()),
            ("script/app.js", b"run()".as_slice()),
        ] {
            let mut entry = archive.by_name(name).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            assert_eq!(content, expected, "mismatched bytes for {name}");
        }
    }

    #[tokio::test]
    async fn test_write_archive_missing_working_dir_errors() {
        let out = TempDir::new().unwrap();
        let result = write_archive(
            Path::new("/nonexistent/websnap-work"),
            "https://example.com",
            out.path(),
        )
        .await;
        assert!(matches!(result, Err(ArchiveError::Walk(_))));
    }
}
