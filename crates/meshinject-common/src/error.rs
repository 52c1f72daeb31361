//! Error types shared across meshinject crates
//!
//! Errors carry a context string naming the operation that failed so log
//! lines can be traced back without a backtrace.

use thiserror::Error;

/// Main error type for meshinject operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "create_client", "get_job")
        context: String,
    },
}

impl Error {
    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            Error::Kube { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_with_context() {
        let err = Error::internal_with_context("get_job", "connection reset");
        assert_eq!(err.context(), Some("get_job"));
        assert!(err.to_string().contains("[get_job]"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn kube_errors_convert_without_context() {
        let err: Error = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code: 403,
        })
        .into();
        assert!(matches!(err, Error::Kube { .. }));
        assert_eq!(err.context(), None);
        assert!(err.to_string().starts_with("kubernetes error"));
    }
}
