//! Sidecar configuration handed over by the webhook

use serde::{Deserialize, Serialize};

/// Settings that shape the sidecar's shutdown script and TLS mounts.
///
/// Every field is optional and an empty string counts as unset. The TLS
/// file fields only take effect when `cert_volume` is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarConfig {
    /// Consul ACL auth method; when set the sidecar logs out on shutdown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,
    /// Secret (and volume) holding TLS material, in the pod's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_volume: Option<String>,
    /// Key of the CA certificate in the secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<String>,
    /// Key of the client certificate in the secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_file: Option<String>,
    /// Key of the client private key in the secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key_file: Option<String>,
    /// SNI override used when talking to the Consul agent over TLS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_server_name: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl SidecarConfig {
    /// Set the ACL auth method
    pub fn with_auth_method(mut self, method: impl Into<String>) -> Self {
        self.auth_method = Some(method.into());
        self
    }

    /// Set the TLS secret volume
    pub fn with_cert_volume(mut self, volume: impl Into<String>) -> Self {
        self.cert_volume = Some(volume.into());
        self
    }

    /// Set the CA certificate key
    pub fn with_ca_file(mut self, key: impl Into<String>) -> Self {
        self.ca_file = Some(key.into());
        self
    }

    /// Set the client certificate key
    pub fn with_client_cert_file(mut self, key: impl Into<String>) -> Self {
        self.client_cert_file = Some(key.into());
        self
    }

    /// Set the client key key
    pub fn with_client_key_file(mut self, key: impl Into<String>) -> Self {
        self.client_key_file = Some(key.into());
        self
    }

    /// Set the TLS server name
    pub fn with_tls_server_name(mut self, name: impl Into<String>) -> Self {
        self.tls_server_name = Some(name.into());
        self
    }

    /// Auth method, if set and non-empty
    pub fn auth_method(&self) -> Option<&str> {
        non_empty(&self.auth_method)
    }

    /// TLS secret volume name, if set and non-empty
    pub fn cert_volume(&self) -> Option<&str> {
        non_empty(&self.cert_volume)
    }

    /// CA key, if set and non-empty
    pub fn ca_file(&self) -> Option<&str> {
        non_empty(&self.ca_file)
    }

    /// Client certificate key, if set and non-empty
    pub fn client_cert_file(&self) -> Option<&str> {
        non_empty(&self.client_cert_file)
    }

    /// Client key key, if set and non-empty
    pub fn client_key_file(&self) -> Option<&str> {
        non_empty(&self.client_key_file)
    }

    /// TLS server name, if set and non-empty
    pub fn tls_server_name(&self) -> Option<&str> {
        non_empty(&self.tls_server_name)
    }

    /// Whether the sidecar talks to Consul over TLS
    pub fn tls_enabled(&self) -> bool {
        self.cert_volume().is_some()
    }
}
