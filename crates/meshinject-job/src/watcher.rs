//! Poll-based Job completion watcher
//!
//! One GET per tick, at most one DELETE at the end.

use std::fmt;
use std::time::Duration;

use k8s_openapi::api::batch::v1::Job;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use meshinject_common::kube_utils::{has_condition, CONDITION_COMPLETE, CONDITION_FAILED};

use crate::client::JobClient;
use crate::error::JobError;

/// Time between polls in production
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long to wait for the Job before giving up
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Where a watched Job stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchOutcome {
    /// No terminal condition observed yet
    Pending,
    /// `Complete=True`; the Job has been deleted
    Succeeded,
    /// `Failed=True`; the Job is kept
    Failed,
    /// The Job does not exist
    NotFound,
    /// The deadline passed while the Job was still pending
    TimedOut,
}

impl WatchOutcome {
    /// Whether polling stops at this outcome
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WatchOutcome::Pending)
    }
}

impl fmt::Display for WatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatchOutcome::Pending => "pending",
            WatchOutcome::Succeeded => "succeeded",
            WatchOutcome::Failed => "failed",
            WatchOutcome::NotFound => "not found",
            WatchOutcome::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// Outcome implied by a Job's current conditions
///
/// Complete wins if a Job somehow carries both conditions.
pub fn job_outcome(job: &Job) -> WatchOutcome {
    let conditions = job.status.as_ref().and_then(|s| s.conditions.as_deref());
    if has_condition(conditions, CONDITION_COMPLETE) {
        WatchOutcome::Succeeded
    } else if has_condition(conditions, CONDITION_FAILED) {
        WatchOutcome::Failed
    } else {
        WatchOutcome::Pending
    }
}

/// Poll timing for [`JobCompletionWatcher`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchConfig {
    /// Sleep between polls
    pub poll_interval: Duration,
    /// Overall budget measured from the first poll
    pub deadline: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

/// State of one watch, owned by the polling loop
#[derive(Clone, Debug)]
pub struct JobWatchState {
    /// Namespace of the Job
    pub namespace: String,
    /// Name of the Job
    pub job_name: String,
    /// Sleep between polls
    pub poll_interval: Duration,
    /// Overall budget
    pub deadline: Duration,
    outcome: WatchOutcome,
    polls: u32,
}

impl JobWatchState {
    /// Fresh state in `Pending`
    pub fn new(namespace: impl Into<String>, job_name: impl Into<String>, config: &WatchConfig) -> Self {
        Self {
            namespace: namespace.into(),
            job_name: job_name.into(),
            poll_interval: config.poll_interval,
            deadline: config.deadline,
            outcome: WatchOutcome::Pending,
            polls: 0,
        }
    }

    /// Current outcome
    pub fn outcome(&self) -> WatchOutcome {
        self.outcome
    }

    /// Number of observations recorded so far
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Record the result of one successful fetch; `None` means the Job is absent.
    ///
    /// Terminal outcomes are sticky.
    pub fn observe(&mut self, job: Option<&Job>) -> WatchOutcome {
        if self.outcome.is_terminal() {
            return self.outcome;
        }
        self.polls += 1;
        self.outcome = match job {
            None => WatchOutcome::NotFound,
            Some(job) => job_outcome(job),
        };
        self.outcome
    }

    /// Record that the deadline passed; no effect once terminal
    pub fn expire(&mut self) -> WatchOutcome {
        if !self.outcome.is_terminal() {
            self.outcome = WatchOutcome::TimedOut;
        }
        self.outcome
    }
}

/// Waits for a Job to finish and deletes it if it succeeded
pub struct JobCompletionWatcher<C> {
    client: C,
    config: WatchConfig,
}

impl<C: JobClient> JobCompletionWatcher<C> {
    /// Create a watcher over the given client
    pub fn new(client: C, config: WatchConfig) -> Self {
        Self { client, config }
    }

    /// Block until the Job is terminal or the deadline passes.
    ///
    /// Returns `Succeeded` (after deleting the Job), `Failed` or `NotFound`.
    /// Fetch errors are logged and retried on the next tick. The deadline is
    /// checked against a monotonic clock after every poll, so the future can
    /// also be dropped or wrapped in `tokio::time::timeout` by the caller.
    #[instrument(skip(self))]
    pub async fn watch(&self, namespace: &str, name: &str) -> Result<WatchOutcome, JobError> {
        let mut state = JobWatchState::new(namespace, name, &self.config);
        let start = Instant::now();

        loop {
            match self.client.get_job(namespace, name).await {
                Ok(job) => {
                    state.observe(job.as_ref());
                }
                Err(e) => {
                    warn!(error = %e, "failed to get job, will retry");
                }
            }

            match state.outcome() {
                WatchOutcome::Succeeded => {
                    info!("job completed successfully, deleting");
                    self.client
                        .delete_job(namespace, name)
                        .await
                        .map_err(|source| JobError::Delete {
                            namespace: namespace.to_string(),
                            name: name.to_string(),
                            source,
                        })?;
                    info!("job deleted");
                    return Ok(WatchOutcome::Succeeded);
                }
                WatchOutcome::Failed => {
                    warn!("job failed, leaving it in place for inspection");
                    return Ok(WatchOutcome::Failed);
                }
                WatchOutcome::NotFound => {
                    info!("job not found, nothing to do");
                    return Ok(WatchOutcome::NotFound);
                }
                WatchOutcome::Pending | WatchOutcome::TimedOut => {}
            }

            let elapsed = start.elapsed();
            if elapsed >= self.config.deadline {
                state.expire();
                warn!(polls = state.polls(), elapsed = ?elapsed, "gave up waiting for job");
                return Err(JobError::TimedOut {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    deadline: self.config.deadline,
                });
            }

            let remaining = self.config.deadline - elapsed;
            debug!(polls = state.polls(), "job still running");
            tokio::time::sleep(self.config.poll_interval.min(remaining)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use k8s_openapi::api::batch::v1::{JobCondition, JobStatus};
    use meshinject_common::Error;

    use super::*;
    use crate::client::MockJobClient;

    fn job_with(conditions: Vec<(&str, &str)>) -> Job {
        Job {
            status: Some(JobStatus {
                active: Some(if conditions.is_empty() { 1 } else { 0 }),
                conditions: Some(
                    conditions
                        .into_iter()
                        .map(|(type_, status)| JobCondition {
                            type_: type_.to_string(),
                            status: status.to_string(),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn running() -> Job {
        job_with(vec![])
    }

    fn fast() -> WatchConfig {
        WatchConfig {
            poll_interval: Duration::from_millis(10),
            deadline: Duration::from_millis(200),
        }
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    #[test]
    fn outcome_from_conditions() {
        assert_eq!(job_outcome(&running()), WatchOutcome::Pending);
        assert_eq!(
            job_outcome(&job_with(vec![("Complete", "True")])),
            WatchOutcome::Succeeded
        );
        assert_eq!(
            job_outcome(&job_with(vec![("Failed", "True")])),
            WatchOutcome::Failed
        );
        assert_eq!(
            job_outcome(&job_with(vec![("Complete", "False"), ("Failed", "Unknown")])),
            WatchOutcome::Pending
        );
        assert_eq!(job_outcome(&Job::default()), WatchOutcome::Pending);
    }

    #[test]
    fn state_starts_pending_and_absent_job_is_not_found() {
        let mut state = JobWatchState::new("default", "job", &fast());
        assert_eq!(state.outcome(), WatchOutcome::Pending);
        assert_eq!(state.observe(None), WatchOutcome::NotFound);
        assert_eq!(state.polls(), 1);
    }

    #[test]
    fn terminal_outcomes_are_sticky() {
        let mut state = JobWatchState::new("default", "job", &fast());
        state.observe(Some(&job_with(vec![("Failed", "True")])));
        assert_eq!(state.observe(Some(&running())), WatchOutcome::Failed);
        assert_eq!(state.observe(None), WatchOutcome::Failed);
        assert_eq!(state.expire(), WatchOutcome::Failed);
        assert_eq!(state.polls(), 1);
    }

    #[test]
    fn pending_state_expires() {
        let mut state = JobWatchState::new("default", "job", &fast());
        state.observe(Some(&running()));
        assert_eq!(state.expire(), WatchOutcome::TimedOut);
        assert!(state.outcome().is_terminal());
    }

    #[test]
    fn default_config_polls_every_few_seconds() {
        let config = WatchConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.deadline, Duration::from_secs(1800));
    }

    // =========================================================================
    // Watch loop
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn succeeded_job_is_deleted_once() {
        let mut mock = MockJobClient::new();
        mock.expect_get_job()
            .returning(|_, _| Ok(Some(job_with(vec![("Complete", "True")]))));
        mock.expect_delete_job().times(1).returning(|ns, name| {
            assert_eq!(ns, "default");
            assert_eq!(name, "job");
            Ok(())
        });

        let watcher = JobCompletionWatcher::new(mock, fast());
        assert_eq!(
            watcher.watch("default", "job").await.unwrap(),
            WatchOutcome::Succeeded
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_is_not_deleted() {
        let mut mock = MockJobClient::new();
        mock.expect_get_job()
            .returning(|_, _| Ok(Some(job_with(vec![("Failed", "True")]))));
        mock.expect_delete_job().never();

        let watcher = JobCompletionWatcher::new(mock, fast());
        assert_eq!(
            watcher.watch("default", "job").await.unwrap(),
            WatchOutcome::Failed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_job_returns_without_waiting() {
        let mut mock = MockJobClient::new();
        mock.expect_get_job().times(1).returning(|_, _| Ok(None));
        mock.expect_delete_job().never();

        let start = Instant::now();
        let watcher = JobCompletionWatcher::new(mock, fast());
        assert_eq!(
            watcher.watch("default", "job").await.unwrap(),
            WatchOutcome::NotFound
        );
        assert!(start.elapsed() < fast().poll_interval);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let mut mock = MockJobClient::new();
        mock.expect_get_job().returning(move |_, _| {
            match c.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(Error::internal_with_context("get_job", "connection reset")),
                2 => Ok(Some(running())),
                _ => Ok(Some(job_with(vec![("Complete", "True")]))),
            }
        });
        mock.expect_delete_job().times(1).returning(|_, _| Ok(()));

        let watcher = JobCompletionWatcher::new(mock, fast());
        assert_eq!(
            watcher.watch("default", "job").await.unwrap(),
            WatchOutcome::Succeeded
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_errors_time_out() {
        let mut mock = MockJobClient::new();
        mock.expect_get_job()
            .returning(|_, _| Err(Error::internal_with_context("get_job", "forbidden")));
        mock.expect_delete_job().never();

        let watcher = JobCompletionWatcher::new(mock, fast());
        let err = watcher.watch("default", "job").await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_failure_is_surfaced_without_retry() {
        let mut mock = MockJobClient::new();
        mock.expect_get_job()
            .returning(|_, _| Ok(Some(job_with(vec![("Complete", "True")]))));
        mock.expect_delete_job()
            .times(1)
            .returning(|_, _| Err(Error::internal_with_context("delete_job", "forbidden")));

        let watcher = JobCompletionWatcher::new(mock, fast());
        let err = watcher.watch("default", "job").await.unwrap_err();
        match &err {
            JobError::Delete {
                namespace, name, ..
            } => {
                assert_eq!(namespace, "default");
                assert_eq!(name, "job");
            }
            other => panic!("expected delete error, got {other:?}"),
        }
        assert!(!err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let mut mock = MockJobClient::new();
        mock.expect_get_job().returning(move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(Some(running()))
        });
        mock.expect_delete_job().never();

        let config = WatchConfig {
            poll_interval: Duration::from_millis(30),
            deadline: Duration::from_millis(100),
        };
        let start = Instant::now();
        let watcher = JobCompletionWatcher::new(mock, config);
        let err = watcher.watch("default", "job").await.unwrap_err();

        assert!(matches!(
            err,
            JobError::TimedOut { deadline, .. } if deadline == Duration::from_millis(100)
        ));
        // Polls at 0, 30, 60, 90 and a final one clamped to the deadline
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(130));
    }
}
