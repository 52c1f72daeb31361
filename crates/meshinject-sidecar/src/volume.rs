//! Pod volumes used by the sidecar

use tracing::debug;

use crate::config::SidecarConfig;
use crate::k8s::{KeyToPath, Volume};
use crate::{CA_CERT_PATH, CLIENT_CERT_PATH, CLIENT_KEY_PATH, WORKING_VOLUME_NAME};

/// The emptyDir shared between the init container and the sidecar.
///
/// Always added to injected pods.
pub fn working_volume() -> Volume {
    Volume::empty_dir(WORKING_VOLUME_NAME)
}

/// Secret-backed volume exposing TLS material at fixed file names.
///
/// The secret is expected to share the volume's name. Only keys with a
/// non-empty name are projected, in CA, cert, key order, to `ca.crt`,
/// `tls.crt` and `tls.key`. Callers must pass a non-empty volume name.
pub fn cert_secret_volume(
    volume_name: &str,
    ca_file: Option<&str>,
    cert_file: Option<&str>,
    key_file: Option<&str>,
) -> Volume {
    debug_assert!(!volume_name.is_empty(), "cert volume name must not be empty");

    let projections = [
        ("CA file", ca_file, CA_CERT_PATH),
        ("cert file", cert_file, CLIENT_CERT_PATH),
        ("key file", key_file, CLIENT_KEY_PATH),
    ];

    let items = projections
        .into_iter()
        .filter_map(|(what, key, path)| {
            let key = key.filter(|k| !k.is_empty())?;
            debug!(volume = %volume_name, key = %key, path = %path, "TLS secret volume: {} set", what);
            Some(KeyToPath {
                key: key.to_string(),
                path: path.to_string(),
            })
        })
        .collect();

    Volume::secret(volume_name, volume_name, items)
}

/// The TLS volume for a config, or `None` when no cert volume is configured
pub fn cert_volume_for(config: &SidecarConfig) -> Option<Volume> {
    config.cert_volume().map(|name| {
        cert_secret_volume(
            name,
            config.ca_file(),
            config.client_cert_file(),
            config.client_key_file(),
        )
    })
}
