//! Webpage snapshot engine.
//!
//! Given a URL, the engine fetches the HTML document, discovers its linked
//! stylesheet and script resources, downloads them concurrently, rewrites
//! their references to local relative paths, persists the rewritten document
//! plus resources under a working directory, and packages that tree into a
//! single zip archive whose path is returned to the caller.
//!
//! The crate is a library: whatever triggers captures (a chat bot, a CLI, a
//! job queue) is an external delivery shell that passes in a
//! [`SnapshotRequest`], receives back an archive path or an error, and is
//! responsible for consuming the archive and then invoking
//! [`remove_working_dir`].
//!
//! # Architecture
//!
//! - [`fetch`] - HTTP fetch over a per-capture connection pool
//! - [`page`] - best-effort HTML parsing and reference rewriting
//! - [`collect`] - concurrent resource collection and persistence
//! - [`archive`] - zip packaging of the working directory
//! - [`snapshot`] - capture orchestration, config, and cleanup
//! - [`runner`] - bounded worker pool for concurrent captures

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod collect;
pub mod fetch;
pub mod page;
pub mod runner;
pub mod snapshot;
mod user_agent;

// Re-export commonly used types
pub use archive::{ArchiveError, archive_name, write_archive};
pub use collect::{
    CollectError, CollectStats, ResourceRef, TARGET_RULES, TargetRule, collect_resources,
    sanitize_resource_name,
};
pub use fetch::{FetchError, Fetcher};
pub use page::PageDocument;
pub use runner::{DEFAULT_WORKERS, RunnerError, SnapshotHandle, SnapshotRunner};
pub use snapshot::{
    SnapshotConfig, SnapshotError, SnapshotRequest, Snapshotter, remove_working_dir,
};
