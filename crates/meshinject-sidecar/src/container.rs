//! The Envoy sidecar container

use crate::config::SidecarConfig;
use crate::error::SidecarError;
use crate::k8s::{Container, EnvVar, Lifecycle, LifecycleHandler, VolumeMount};
use crate::script::render_pre_stop_script;
use crate::{
    ENVOY_BOOTSTRAP_PATH, ENVOY_MAX_OBJ_NAME_LEN, HOST_IP_ENV, HOST_IP_FIELD_PATH,
    SIDECAR_CONTAINER_NAME, TLS_DIR, WORKING_DIR, WORKING_VOLUME_NAME,
};

/// Build the sidecar container for `image`.
///
/// The working volume is always mounted first; the TLS volume follows when
/// `cert_volume` is set. `HOST_IP` comes from the downward API because the
/// proxy reaches Consul through the agent on its own node.
pub fn sidecar_container(config: &SidecarConfig, image: &str) -> Result<Container, SidecarError> {
    let script = render_pre_stop_script(config)?;

    let mut volume_mounts = vec![VolumeMount::new(WORKING_VOLUME_NAME, WORKING_DIR)];
    if let Some(cert_volume) = config.cert_volume() {
        volume_mounts.push(VolumeMount::new(cert_volume, TLS_DIR));
    }

    Ok(Container {
        name: SIDECAR_CONTAINER_NAME.to_string(),
        image: image.to_string(),
        command: vec![
            "envoy".to_string(),
            "--max-obj-name-len".to_string(),
            ENVOY_MAX_OBJ_NAME_LEN.to_string(),
            "--config-path".to_string(),
            ENVOY_BOOTSTRAP_PATH.to_string(),
        ],
        env: vec![EnvVar::field_ref(HOST_IP_ENV, HOST_IP_FIELD_PATH)],
        volume_mounts,
        lifecycle: Some(Lifecycle {
            pre_stop: Some(LifecycleHandler::exec(vec![
                "/bin/sh".to_string(),
                "-ec".to_string(),
                script,
            ])),
        }),
    })
}
