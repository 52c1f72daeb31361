//! Delete-completed-job command
//!
//! Blocks until the named Job reaches a terminal condition. A successful Job
//! is deleted along with its pods; a failed one is left for inspection. Either
//! way, and when the Job does not exist, the command exits 0. Timing out or
//! failing to delete exits 1.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tracing::info;

use meshinject_common::DEFAULT_NAMESPACE;
use meshinject_job::{JobClient, JobCompletionWatcher, KubeJobClient, WatchConfig, WatchOutcome};

use crate::{Error, Result};

/// Delete-completed-job command arguments
#[derive(Args, Debug)]
pub struct DeleteCompletedJobArgs {
    /// Name of the Job to wait for
    pub job_name: String,

    /// Namespace of the Job
    #[arg(long = "k8s-namespace", short = 'n', default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Time between status checks (e.g., "2s", "500ms")
    #[arg(long, default_value = "2s", value_parser = super::parse_duration)]
    pub poll_interval: Duration,

    /// Give up if the Job has not finished within this long (e.g., "30m", "1h")
    #[arg(long, default_value = "30m", value_parser = super::parse_duration)]
    pub timeout: Duration,

    /// Path to kubeconfig (defaults to in-cluster or ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,
}

impl DeleteCompletedJobArgs {
    /// Check arguments that clap cannot express, before touching the cluster
    pub fn validate(&self) -> Result<()> {
        if self.job_name.trim().is_empty() {
            return Err(Error::usage("job name must not be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::usage("--poll-interval must be greater than zero"));
        }
        Ok(())
    }

    fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            poll_interval: self.poll_interval,
            deadline: self.timeout,
        }
    }
}

/// Run the delete-completed-job command
pub async fn run(args: DeleteCompletedJobArgs) -> Result<()> {
    args.validate()?;
    let client = super::kube_client(args.kubeconfig.as_deref()).await?;
    run_with(KubeJobClient::new(client), args).await
}

/// Wait for the Job through `client` and report the outcome.
///
/// Succeeded, Failed and NotFound are all `Ok`; a timeout or a failed delete
/// is an error.
pub async fn run_with<C: JobClient>(client: C, args: DeleteCompletedJobArgs) -> Result<()> {
    args.validate()?;
    let watcher = JobCompletionWatcher::new(client, args.watch_config());

    info!(
        namespace = %args.namespace,
        job = %args.job_name,
        timeout = ?args.timeout,
        "waiting for job to finish"
    );
    let outcome = watcher.watch(&args.namespace, &args.job_name).await?;

    match outcome {
        WatchOutcome::Succeeded => println!("job {} succeeded and was deleted", args.job_name),
        WatchOutcome::Failed => println!("job {} failed, not deleting", args.job_name),
        WatchOutcome::NotFound => println!("job {} not found", args.job_name),
        other => info!(outcome = %other, "watch ended"),
    }
    Ok(())
}
