//! CLI commands

use std::path::Path;
use std::time::Duration;

use kube::Client;
use tracing::debug;

use crate::{Error, Result};

pub mod delete_completed_job;
pub mod render_sidecar;

/// Parse a duration string like "250ms", "30s", "5m", "1h" or bare seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = || {
        Error::validation(format!(
            "invalid duration '{}', expected e.g. 250ms, 30s, 5m, 1h",
            s
        ))
    };

    // "ms" before the single-letter suffixes it overlaps with
    let (digits, unit_ms): (&str, u64) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000)
    } else {
        (s, 1_000)
    };

    let n: u64 = digits.parse().map_err(|_| invalid())?;
    n.checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}

/// Build a kube client, from `kubeconfig` if given or the ambient config otherwise.
pub async fn kube_client(kubeconfig: Option<&Path>) -> Result<Client> {
    debug!(kubeconfig = ?kubeconfig, "creating kubernetes client");
    Ok(meshinject_common::kube_utils::create_client(kubeconfig).await?)
}
