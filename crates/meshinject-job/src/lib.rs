//! Job completion watcher
//!
//! Waits for a batch Job to reach a terminal condition and deletes it once it
//! has succeeded. Failed Jobs are left in place so their pods and logs stay
//! available for inspection.
//!
//! State machine per poll:
//! `Pending → {Succeeded, Failed, NotFound, TimedOut}`

pub mod client;
pub mod error;
pub mod watcher;

pub use client::{JobClient, KubeJobClient};
pub use error::JobError;
pub use watcher::{JobCompletionWatcher, JobWatchState, WatchConfig, WatchOutcome};
