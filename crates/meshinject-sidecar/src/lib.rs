//! Envoy sidecar construction for Consul Connect injection
//!
//! Builds the pieces the injector adds to a pod:
//! - the shared working volume and the optional TLS secret volume ([`volume`])
//! - the pre-stop script that deregisters the service ([`script`])
//! - the sidecar container itself ([`container`])
//!
//! Everything here is pure construction. The only cluster access is the
//! optional read-only check that the TLS secret carries the configured keys
//! ([`secret`]).

#![deny(missing_docs)]

pub mod config;
pub mod container;
pub mod error;
pub mod inject;
pub mod k8s;
pub mod script;
pub mod secret;
pub mod volume;

pub use config::SidecarConfig;
pub use container::sidecar_container;
pub use error::SidecarError;
pub use inject::{build_sidecar, InjectedSidecar};
pub use script::render_pre_stop_script;
pub use volume::{cert_secret_volume, cert_volume_for, working_volume};

// =============================================================================
// Paths inside the sidecar
// =============================================================================

/// Name of the emptyDir volume shared between the init container and the sidecar
pub const WORKING_VOLUME_NAME: &str = "consul-connect-inject-data";

/// Mount path of the working volume; holds the consul binary, service
/// registration and ACL token written by the init container
pub const WORKING_DIR: &str = "/consul/connect-inject";

/// Mount path of the TLS secret volume
pub const TLS_DIR: &str = "/consul/connect-inject/tls";

/// File name of the CA certificate inside [`TLS_DIR`]
pub const CA_CERT_PATH: &str = "ca.crt";

/// File name of the client certificate inside [`TLS_DIR`]
pub const CLIENT_CERT_PATH: &str = "tls.crt";

/// File name of the client key inside [`TLS_DIR`]
pub const CLIENT_KEY_PATH: &str = "tls.key";

// =============================================================================
// Container
// =============================================================================

/// Name of the injected sidecar container
pub const SIDECAR_CONTAINER_NAME: &str = "consul-connect-envoy-sidecar";

/// Env var carrying the node IP, where the local Consul agent listens
pub const HOST_IP_ENV: &str = "HOST_IP";

/// Downward API field resolving to the node IP
pub const HOST_IP_FIELD_PATH: &str = "status.hostIP";

/// Consul agent HTTP port
pub const CONSUL_HTTP_PORT: u16 = 8500;

/// Consul agent HTTPS port
pub const CONSUL_HTTPS_PORT: u16 = 8501;

/// Envoy limit on stat/cluster object names
pub const ENVOY_MAX_OBJ_NAME_LEN: u32 = 256;

/// Bootstrap config written by the init container
pub const ENVOY_BOOTSTRAP_PATH: &str = "/consul/connect-inject/envoy-bootstrap.yaml";
