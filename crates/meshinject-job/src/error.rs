//! Job watcher error types

use std::time::Duration;

/// Errors surfaced by the job watcher
///
/// A missing Job is not an error: it is reported as
/// [`WatchOutcome::NotFound`](crate::WatchOutcome::NotFound).
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The Job never reached Complete or Failed before the deadline; it was
    /// left untouched
    #[error("timed out after {deadline:?} waiting for job {namespace}/{name} to finish")]
    TimedOut {
        namespace: String,
        name: String,
        deadline: Duration,
    },

    /// The Job succeeded but deleting it failed; the delete is not retried
    #[error("job {namespace}/{name} succeeded but could not be deleted: {source}")]
    Delete {
        namespace: String,
        name: String,
        source: meshinject_common::Error,
    },
}

impl JobError {
    /// Whether this error is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, JobError::TimedOut { .. })
    }
}
