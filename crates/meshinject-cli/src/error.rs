//! Error types for the CLI

use meshinject_job::JobError;
use meshinject_sidecar::SidecarError;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("usage error: {message}")]
    Usage { message: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error(transparent)]
    Common(#[from] meshinject_common::Error),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }
}
