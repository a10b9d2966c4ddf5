//! Resource collection: discovery, filtering, sanitization, reference
//! rewriting, and concurrent persistence.
//!
//! A static table of [`TargetRule`]s drives one generic routine: for each
//! rule, every matching reference is sanitized, filtered, resolved against
//! the page's base URL, rewritten in the document to `<tag>/<filename>`, and
//! downloaded into the tag's subdirectory of the working directory. The
//! rewrite happens unconditionally, before and regardless of the download
//! outcome: a broken link in the snapshot beats a broken snapshot.
//!
//! Tag groups run concurrently with each other and every resource within a
//! group downloads concurrently. An individual fetch or write failure is
//! logged and isolated; it never aborts sibling downloads or the capture.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures_util::future::join_all;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::fetch::{FetchError, Fetcher};
use crate::page::PageDocument;

/// One (tag, attribute, filter) entry of the static dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct TargetRule {
    /// Tag to search for (`link`, `script`).
    pub tag: &'static str,
    /// Attribute holding the resource URL (`href`, `src`).
    pub attr: &'static str,
    /// Keep predicate applied to the sanitized filename.
    pub filter: fn(&str) -> bool,
}

/// Keeps names containing `css` or `js`, compared case-insensitively.
///
/// Intentionally permissive substring match, not an extension check:
/// `discuss.pdf` passes. This is the filtering the engine has always done
/// and is preserved as-is.
fn stylesheet_name_filter(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("css") || name.contains("js")
}

fn unfiltered(_name: &str) -> bool {
    true
}

/// Stylesheet references: `<link href=...>`, filtered to css/js-ish names.
pub const STYLESHEET_RULE: TargetRule = TargetRule {
    tag: "link",
    attr: "href",
    filter: stylesheet_name_filter,
};

/// Script references: `<script src=...>`, unfiltered.
pub const SCRIPT_RULE: TargetRule = TargetRule {
    tag: "script",
    attr: "src",
    filter: unfiltered,
};

/// The full dispatch table in collection order.
pub const TARGET_RULES: [TargetRule; 2] = [STYLESHEET_RULE, SCRIPT_RULE];

#[allow(clippy::expect_used)]
static NON_WORD_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("static regex must compile"));

/// Derives the on-disk filename for a reference: the URL basename (text
/// after the last `/`) with every run of non-word characters collapsed to a
/// single `.`. Idempotent.
#[must_use]
pub fn sanitize_resource_name(attr_value: &str) -> String {
    let basename = attr_value.rsplit('/').next().unwrap_or_default();
    NON_WORD_RUNS.replace_all(basename, ".").into_owned()
}

/// A discovered stylesheet/script reference, tracked from discovery through
/// download to attribute rewrite.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    /// Owning tag name.
    pub tag: &'static str,
    /// Attribute the URL came from.
    pub attr: &'static str,
    /// The attribute value exactly as it appears in the document.
    pub original: String,
    /// The value resolved against the page's base URL.
    pub resolved: Url,
    /// Sanitized local filename within the tag subdirectory.
    pub filename: String,
}

/// Counters for one collection run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectStats {
    /// Resources fetched and written to disk.
    pub saved: usize,
    /// Resources skipped: already on disk, or the server sent an empty body.
    pub skipped: usize,
    /// Resources whose fetch or write failed (logged, not propagated).
    pub failed: usize,
}

/// Error aborting a collection run.
///
/// Per-resource failures never surface here; only workspace setup does.
#[derive(Debug, Error)]
pub enum CollectError {
    /// A tag subdirectory could not be created.
    #[error("failed to create resource directory {path}: {source}")]
    Workspace {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Per-resource failure, logged by the caller and never propagated.
#[derive(Debug, Error)]
enum ResourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

enum Outcome {
    Saved,
    Skipped,
    Failed,
}

/// Discovers, rewrites, and persists every resource for the given rules.
///
/// Every reference that passes its rule's filter has its attribute rewritten
/// to `<tag>/<filename>` whether or not the download later succeeds. A file
/// already present under its sanitized name is not re-downloaded, which
/// makes re-runs against the same working directory idempotent and means
/// the first arrival wins on a filename collision.
///
/// # Errors
///
/// Returns [`CollectError::Workspace`] when a tag subdirectory cannot be
/// created. Individual fetch or write failures are logged and counted in
/// the returned [`CollectStats`], never propagated.
#[instrument(skip_all, fields(working_dir = %working_dir.display()))]
pub async fn collect_resources(
    fetcher: &Fetcher,
    page: &mut PageDocument,
    working_dir: &Path,
    rules: &[TargetRule],
) -> Result<CollectStats, CollectError> {
    let mut groups = Vec::with_capacity(rules.len());
    for rule in rules {
        let references = discover(page, rule);
        let tag_dir = working_dir.join(rule.tag);
        tokio::fs::create_dir_all(&tag_dir)
            .await
            .map_err(|source| CollectError::Workspace {
                path: tag_dir.clone(),
                source,
            })?;

        for reference in &references {
            let local = format!("{}/{}", reference.tag, reference.filename);
            page.rewrite_attribute(reference.attr, &reference.original, &local);
        }
        groups.push((tag_dir, references));
    }

    // Two levels of fan-out: tag groups concurrently, and every resource
    // within a group concurrently.
    let outcomes: Vec<Outcome> = join_all(groups.into_iter().map(|(tag_dir, references)| {
        async move {
            join_all(
                references
                    .into_iter()
                    .map(|reference| save_resource(fetcher, reference, &tag_dir)),
            )
            .await
        }
    }))
    .await
    .into_iter()
    .flatten()
    .collect();

    let mut stats = CollectStats::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Saved => stats.saved += 1,
            Outcome::Skipped => stats.skipped += 1,
            Outcome::Failed => stats.failed += 1,
        }
    }
    debug!(
        saved = stats.saved,
        skipped = stats.skipped,
        failed = stats.failed,
        "resource collection complete"
    );
    Ok(stats)
}

/// Enumerates the references of one rule that pass its filter and resolve
/// against the page base, in document order.
fn discover(page: &PageDocument, rule: &TargetRule) -> Vec<ResourceRef> {
    page.attribute_values(rule.tag, rule.attr)
        .into_iter()
        .filter_map(|original| {
            let filename = sanitize_resource_name(&original);
            if !(rule.filter)(&filename) {
                return None;
            }
            match page.base().join(&original) {
                Ok(resolved) => Some(ResourceRef {
                    tag: rule.tag,
                    attr: rule.attr,
                    original,
                    resolved,
                    filename,
                }),
                Err(error) => {
                    warn!(
                        tag = rule.tag,
                        value = %original,
                        %error,
                        "skipping unresolvable reference"
                    );
                    None
                }
            }
        })
        .collect()
}

async fn save_resource(fetcher: &Fetcher, reference: ResourceRef, tag_dir: &Path) -> Outcome {
    let path = tag_dir.join(&reference.filename);
    let already_saved = tokio::fs::metadata(&path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if already_saved {
        debug!(path = %path.display(), "resource already on disk, skipping download");
        return Outcome::Skipped;
    }

    match download(fetcher, &reference, &path).await {
        Ok(true) => Outcome::Saved,
        Ok(false) => {
            debug!(url = %reference.resolved, "empty response body, nothing written");
            Outcome::Skipped
        }
        Err(error) => {
            warn!(
                url = %reference.resolved,
                path = %path.display(),
                %error,
                "resource download failed; its reference stays rewritten"
            );
            Outcome::Failed
        }
    }
}

/// Fetches one resource and writes it out. Returns `false` when the server
/// sent an empty body and no file was written.
async fn download(
    fetcher: &Fetcher,
    reference: &ResourceRef,
    path: &Path,
) -> Result<bool, ResourceError> {
    let body = fetcher.fetch(&reference.resolved).await?;
    if body.is_empty() {
        return Ok(false);
    }
    tokio::fs::write(path, body)
        .await
        .map_err(|source| ResourceError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(true)
}
