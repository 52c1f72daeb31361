//! Sidecar construction errors

/// Errors raised while building the sidecar or checking its TLS secret
#[derive(Debug, thiserror::Error)]
pub enum SidecarError {
    /// A configured value cannot be embedded in the pre-stop script.
    ///
    /// Raised at construction time and never worth retrying.
    #[error("cannot render pre-stop script: {field} {message}")]
    Script {
        /// Config field holding the offending value
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The TLS secret named by `cert_volume` does not exist
    #[error("certificate secret {namespace}/{name} not found")]
    MissingSecret {
        /// Namespace that was searched
        namespace: String,
        /// Secret name
        name: String,
    },

    /// The TLS secret exists but lacks a configured key
    #[error("certificate secret {namespace}/{name} has no key '{key}'")]
    MissingSecretKey {
        /// Namespace of the secret
        namespace: String,
        /// Secret name
        name: String,
        /// The configured key that is absent
        key: String,
    },

    /// Shared error (Kubernetes access, client setup)
    #[error("{0}")]
    Common(#[from] meshinject_common::Error),
}
