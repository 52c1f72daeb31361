//! Read-only check of the TLS secret referenced by the sidecar config
//!
//! The injector never writes secrets. Before rendering a sidecar that mounts
//! a cert volume it can confirm the secret exists and carries every key the
//! projection names, so a typo surfaces at injection time instead of as a
//! pod stuck in `ContainerCreating`.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::Client;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use meshinject_common::Error;

use crate::config::SidecarConfig;
use crate::error::SidecarError;

/// Trait abstracting Secret lookups
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Get a Secret by namespace and name, `None` if it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error>;
}

/// Real Kubernetes implementation of [`SecretSource`]
pub struct KubeSecretSource {
    client: Client,
}

impl KubeSecretSource {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretSource for KubeSecretSource {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}

/// Confirm the config's cert secret exists and holds every configured key.
///
/// A config without a cert volume passes without any API call.
pub async fn verify_cert_secret(
    source: &dyn SecretSource,
    namespace: &str,
    config: &SidecarConfig,
) -> Result<(), SidecarError> {
    let Some(name) = config.cert_volume() else {
        return Ok(());
    };

    let secret = source
        .get_secret(namespace, name)
        .await?
        .ok_or_else(|| SidecarError::MissingSecret {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })?;

    let wanted = [
        config.ca_file(),
        config.client_cert_file(),
        config.client_key_file(),
    ];
    for key in wanted.into_iter().flatten() {
        if !has_key(&secret, key) {
            return Err(SidecarError::MissingSecretKey {
                namespace: namespace.to_string(),
                name: name.to_string(),
                key: key.to_string(),
            });
        }
    }

    debug!(namespace = %namespace, secret = %name, "certificate secret verified");
    Ok(())
}

/// `stringData` is write-only on the API server, so only `data` is consulted
fn has_key(secret: &Secret, key: &str) -> bool {
    secret.data.as_ref().is_some_and(|d| d.contains_key(key))
}
