//! Bounded worker pool for running captures concurrently.
//!
//! Delivery shells that trigger one capture per incoming command spawn them
//! here instead of detaching fire-and-forget tasks: concurrency is bounded
//! by a semaphore, and every capture hands back a [`SnapshotHandle`] whose
//! join surfaces the outcome - including panics - instead of letting it
//! vanish into the runtime.
//!
//! # Concurrency Model
//!
//! - Each capture runs in its own Tokio task
//! - A semaphore permit is acquired before the capture starts
//! - Permits are released automatically when captures finish (RAII)
//! - There is no cancellation: a spawned capture runs to completion or
//!   failure

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::snapshot::{SnapshotError, SnapshotRequest, Snapshotter};

/// Minimum allowed concurrent captures.
const MIN_WORKERS: usize = 1;

/// Maximum allowed concurrent captures.
const MAX_WORKERS: usize = 64;

/// Default concurrent captures if not specified.
pub const DEFAULT_WORKERS: usize = 5;

/// Error type for runner construction.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkerCount {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Handle to one in-flight capture.
#[derive(Debug)]
pub struct SnapshotHandle {
    source_url: String,
    task: JoinHandle<Result<PathBuf, SnapshotError>>,
}

impl SnapshotHandle {
    /// The source URL this capture was spawned for.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Waits for the capture and returns its outcome.
    ///
    /// # Errors
    ///
    /// Returns the capture's own [`SnapshotError`] on failure. A capture
    /// task that panicked or was aborted reports
    /// [`SnapshotError::Interrupted`] instead of disappearing.
    pub async fn join(self) -> Result<PathBuf, SnapshotError> {
        match self.task.await {
            Ok(result) => result,
            Err(error) => {
                warn!(url = %self.source_url, %error, "capture task did not finish");
                Err(SnapshotError::interrupted(error.to_string()))
            }
        }
    }
}

/// Bounded pool of concurrent snapshot captures.
#[derive(Debug, Clone)]
pub struct SnapshotRunner {
    snapshotter: Snapshotter,
    permits: Arc<Semaphore>,
}

impl SnapshotRunner {
    /// Creates a runner executing at most `workers` captures at once.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::InvalidWorkerCount`] if the value is outside
    /// the valid range (1-64).
    pub fn new(snapshotter: Snapshotter, workers: usize) -> Result<Self, RunnerError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(RunnerError::InvalidWorkerCount { value: workers });
        }
        debug!(workers, "creating snapshot runner");
        Ok(Self {
            snapshotter,
            permits: Arc::new(Semaphore::new(workers)),
        })
    }

    /// Spawns a capture. At most the configured number run at once; the
    /// rest queue on the semaphore in spawn order.
    #[must_use]
    pub fn spawn(&self, request: SnapshotRequest) -> SnapshotHandle {
        let snapshotter = self.snapshotter.clone();
        let permits = Arc::clone(&self.permits);
        let source_url = request.source_url().to_string();
        let task = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| SnapshotError::interrupted("runner semaphore closed"))?;
            snapshotter.capture(&request).await
        });
        SnapshotHandle { source_url, task }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotConfig;

    fn runner(workers: usize) -> Result<SnapshotRunner, RunnerError> {
        SnapshotRunner::new(Snapshotter::new(SnapshotConfig::default()), workers)
    }

    #[test]
    fn test_new_rejects_zero_workers() {
        assert!(matches!(
            runner(0),
            Err(RunnerError::InvalidWorkerCount { value: 0 })
        ));
    }

    #[test]
    fn test_new_rejects_excessive_workers() {
        assert!(matches!(
            runner(65),
            Err(RunnerError::InvalidWorkerCount { value: 65 })
        ));
    }

    #[test]
    fn test_new_accepts_default_worker_count() {
        assert!(runner(DEFAULT_WORKERS).is_ok());
    }

    #[tokio::test]
    async fn test_spawned_capture_failure_surfaces_on_join() {
        let runner = runner(1).unwrap();
        let handle = runner.spawn(SnapshotRequest::new("http://[invalid", "/tmp/none"));
        assert_eq!(handle.source_url(), "http://[invalid");
        let result = handle.join().await;
        assert!(matches!(result, Err(SnapshotError::Fetch(_))));
    }
}
