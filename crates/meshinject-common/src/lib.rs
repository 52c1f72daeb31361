//! Common types for meshinject: errors, Kubernetes helpers, and logging setup

#![deny(missing_docs)]

pub mod error;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;

/// Namespace used when none is given on the command line
pub const DEFAULT_NAMESPACE: &str = "default";
