//! Snapshot orchestration: fetch, parse, collect, persist, archive.
//!
//! [`Snapshotter::capture`] drives one complete capture. The parsed document
//! is created here and passed explicitly through each stage - there is no
//! shared document state, so any number of captures can run concurrently as
//! long as their working directories differ.

mod error;
mod workdir;

pub use error::SnapshotError;
pub use workdir::remove_working_dir;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::collect::{CollectStats, SCRIPT_RULE, STYLESHEET_RULE, TargetRule, collect_resources};
use crate::fetch::{Fetcher, normalize_source_url};
use crate::page::PageDocument;

/// Filename of the rewritten document at the working-directory root.
const PAGE_FILENAME: &str = "page.html";

/// One webpage capture: a source URL plus a destination working directory.
///
/// Immutable once created. Callers running captures concurrently must use
/// distinct destinations; the filesystem namespace is the only state shared
/// between captures.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    source_url: String,
    destination: PathBuf,
}

impl SnapshotRequest {
    /// Creates a request. The URL's scheme may be omitted; it defaults to
    /// `https` at capture time.
    pub fn new(source_url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination: destination.into(),
        }
    }

    /// The source URL exactly as the caller supplied it.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// The working directory for this capture.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// Engine configuration.
///
/// Defaults reproduce the historical behavior: archives land in
/// `downloads/`, both tag groups enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Directory receiving finished archives. Created when absent; must be
    /// distinct from any working directory.
    pub archive_dir: PathBuf,
    /// Collect `<link href=...>` stylesheets.
    pub link_assets: bool,
    /// Collect `<script src=...>` scripts.
    pub script_assets: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            archive_dir: PathBuf::from("downloads"),
            link_assets: true,
            script_assets: true,
        }
    }
}

/// The snapshot engine.
///
/// Cheap to clone and share. Each capture owns its own HTTP connection pool
/// and working directory; the engine itself holds only configuration.
#[derive(Debug, Clone, Default)]
pub struct Snapshotter {
    config: SnapshotConfig,
}

impl Snapshotter {
    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    fn target_rules(&self) -> Vec<TargetRule> {
        let mut rules = Vec::with_capacity(2);
        if self.config.link_assets {
            rules.push(STYLESHEET_RULE);
        }
        if self.config.script_assets {
            rules.push(SCRIPT_RULE);
        }
        rules
    }

    /// Captures one webpage into an archive and returns the archive's path.
    ///
    /// Stages: fetch the root document, parse it, collect and rewrite its
    /// resources into the working directory, write `page.html`, package the
    /// tree. The working directory is left in place for the caller to remove
    /// with [`remove_working_dir`] once the archive has been consumed.
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::Fetch`] - invalid source URL, or the root document
    ///   could not be fetched. Individual resource failures are logged and
    ///   isolated instead.
    /// - [`SnapshotError::Collect`] / [`SnapshotError::Filesystem`] -
    ///   workspace setup or document write failed.
    /// - [`SnapshotError::Archive`] - packaging failed.
    ///
    /// A failed capture may leave a partial working directory behind; the
    /// cleanup contract stays with the caller either way.
    #[instrument(
        skip(self, request),
        fields(url = request.source_url(), destination = %request.destination().display())
    )]
    pub async fn capture(&self, request: &SnapshotRequest) -> Result<PathBuf, SnapshotError> {
        let (source, url) = normalize_source_url(request.source_url())?;
        info!("starting capture");

        // One fetcher per capture: the root document and every resource
        // share a connection pool, nothing is shared across captures.
        let fetcher = Fetcher::new();
        let body = fetcher.fetch(&url).await?;
        let mut page = PageDocument::parse(&body, url);

        workdir::create_working_dir(request.destination()).await?;
        tokio::fs::create_dir_all(&self.config.archive_dir)
            .await
            .map_err(|e| SnapshotError::filesystem(&self.config.archive_dir, e))?;

        let stats = collect_resources(
            &fetcher,
            &mut page,
            request.destination(),
            &self.target_rules(),
        )
        .await?;

        let page_path = request.destination().join(PAGE_FILENAME);
        tokio::fs::write(&page_path, page.as_bytes())
            .await
            .map_err(|e| SnapshotError::filesystem(&page_path, e))?;

        let archive =
            crate::archive::write_archive(request.destination(), &source, &self.config.archive_dir)
                .await?;
        log_complete(&archive, stats);
        Ok(archive)
    }
}

fn log_complete(archive: &Path, stats: CollectStats) {
    info!(
        archive = %archive.display(),
        saved = stats.saved,
        skipped = stats.skipped,
        failed = stats.failed,
        "capture complete"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_match_historical_behavior() {
        let config = SnapshotConfig::default();
        assert_eq!(config.archive_dir, PathBuf::from("downloads"));
        assert!(config.link_assets);
        assert!(config.script_assets);
    }

    #[test]
    fn test_config_deserializes_with_missing_fields() {
        let config: SnapshotConfig =
            serde_json::from_str(r#"{"archive_dir": "/var/snapshots"}"#).unwrap();
        assert_eq!(config.archive_dir, PathBuf::from("/var/snapshots"));
        assert!(config.link_assets);
        assert!(config.script_assets);
    }

    #[test]
    fn test_disabled_tag_groups_drop_their_rules() {
        let engine = Snapshotter::new(SnapshotConfig {
            script_assets: false,
            ..SnapshotConfig::default()
        });
        let rules = engine.target_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].tag, "link");
    }

    #[test]
    fn test_request_preserves_caller_input() {
        let request = SnapshotRequest::new("example.com", "/tmp/work");
        assert_eq!(request.source_url(), "example.com");
        assert_eq!(request.destination(), Path::new("/tmp/work"));
    }
}
