//! Everything the injector adds to a pod for one sidecar

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SidecarConfig;
use crate::container::sidecar_container;
use crate::error::SidecarError;
use crate::k8s::{Container, Volume};
use crate::volume::{cert_volume_for, working_volume};

/// The sidecar container together with the volumes it mounts
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InjectedSidecar {
    /// The Envoy sidecar
    pub container: Container,
    /// Pod volumes, working volume first
    pub volumes: Vec<Volume>,
}

/// Build the sidecar container and its volumes for a pod.
///
/// Every volume mounted by the container is returned, so the caller only
/// has to append both lists to the pod spec.
pub fn build_sidecar(config: &SidecarConfig, image: &str) -> Result<InjectedSidecar, SidecarError> {
    let container = sidecar_container(config, image)?;

    let mut volumes = vec![working_volume()];
    volumes.extend(cert_volume_for(config));

    debug!(
        image = %image,
        tls = config.tls_enabled(),
        auth_method = config.auth_method().unwrap_or_default(),
        volumes = volumes.len(),
        "built sidecar"
    );

    Ok(InjectedSidecar { container, volumes })
}
