//! Pre-stop script for the sidecar
//!
//! On shutdown the sidecar deregisters its service from the local Consul
//! agent and, when it logged in through an auth method, logs out to revoke
//! its ACL token. The script is assembled from a fixed set of branch rules:
//!
//! 1. address export: HTTPS on 8501 (plus optional SNI) with a cert volume,
//!    plain HTTP on 8500 without;
//! 2. `consul services deregister` with `-token-file` when an auth method is
//!    set, then each TLS flag whose file is configured (cert volume only);
//! 3. `consul logout` with the same TLS flags and `-token-file`, only when an
//!    auth method is set.

use crate::config::SidecarConfig;
use crate::error::SidecarError;
use crate::{
    CA_CERT_PATH, CLIENT_CERT_PATH, CLIENT_KEY_PATH, CONSUL_HTTPS_PORT, CONSUL_HTTP_PORT,
    HOST_IP_ENV, TLS_DIR, WORKING_DIR,
};

/// Separator between a command and its continued arguments
const CONTINUATION: &str = " \\\n  ";

/// Characters that would end the double-quoted string or expand inside it
const UNSAFE_CHARS: &[char] = &['"', '\\', '$', '`', '\n', '\r'];

/// Render the sidecar's pre-stop script.
///
/// Deterministic for a given config. Fails only when a value embedded in the
/// script would break out of its quoting.
pub fn render_pre_stop_script(config: &SidecarConfig) -> Result<String, SidecarError> {
    let mut lines = Vec::with_capacity(4);

    if config.tls_enabled() {
        lines.push(format!(
            "export CONSUL_HTTP_ADDR=\"https://${{{HOST_IP_ENV}}}:{CONSUL_HTTPS_PORT}\""
        ));
        if let Some(server_name) = config.tls_server_name() {
            ensure_embeddable("tlsServerName", server_name)?;
            lines.push(format!("export CONSUL_TLS_SERVER_NAME=\"{server_name}\""));
        }
    } else {
        lines.push(format!(
            "export CONSUL_HTTP_ADDR=\"${{{HOST_IP_ENV}}}:{CONSUL_HTTP_PORT}\""
        ));
    }

    let mut deregister = Vec::new();
    if config.auth_method().is_some() {
        deregister.push(token_file_flag());
    }
    deregister.extend(tls_flags(config));
    deregister.push(format!("{WORKING_DIR}/service.hcl"));
    let deregister = command(&format!("{WORKING_DIR}/consul services deregister"), &deregister);

    match config.auth_method() {
        Some(_) => {
            let mut logout = tls_flags(config);
            logout.push(token_file_flag());
            let logout = command(&format!("&& {WORKING_DIR}/consul logout"), &logout);
            // The deregister line continues so the `&&` chain stays one command
            lines.push(format!("{deregister} \\\n{logout}"));
        }
        None => lines.push(deregister),
    }

    Ok(lines.join("\n"))
}

fn command(head: &str, args: &[String]) -> String {
    let mut out = head.to_string();
    for arg in args {
        out.push_str(CONTINUATION);
        out.push_str(arg);
    }
    out
}

fn token_file_flag() -> String {
    format!("-token-file=\"{WORKING_DIR}/acl-token\"")
}

/// CA / client cert / client key flags, each present only when its file is
/// configured and the cert volume is mounted
fn tls_flags(config: &SidecarConfig) -> Vec<String> {
    if !config.tls_enabled() {
        return Vec::new();
    }
    let mut flags = Vec::with_capacity(3);
    if config.ca_file().is_some() {
        flags.push(format!("-ca-file=\"{TLS_DIR}/{CA_CERT_PATH}\""));
    }
    if config.client_cert_file().is_some() {
        flags.push(format!("-client-cert=\"{TLS_DIR}/{CLIENT_CERT_PATH}\""));
    }
    if config.client_key_file().is_some() {
        flags.push(format!("-client-key=\"{TLS_DIR}/{CLIENT_KEY_PATH}\""));
    }
    flags
}

fn ensure_embeddable(field: &'static str, value: &str) -> Result<(), SidecarError> {
    match value.chars().find(|c| UNSAFE_CHARS.contains(c)) {
        Some(c) => Err(SidecarError::Script {
            field,
            message: format!("contains {:?}, which cannot be embedded in a quoted shell string", c),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(config: &SidecarConfig) -> String {
        render_pre_stop_script(config).unwrap()
    }

    /// Every combination of the six config fields
    fn all_configs() -> Vec<SidecarConfig> {
        (0u8..64)
            .map(|bits| {
                let mut config = SidecarConfig::default();
                if bits & 1 != 0 {
                    config = config.with_auth_method("k8s-auth-method");
                }
                if bits & 2 != 0 {
                    config = config.with_cert_volume("consul-tls");
                }
                if bits & 4 != 0 {
                    config = config.with_ca_file("ca.pem");
                }
                if bits & 8 != 0 {
                    config = config.with_client_cert_file("client.pem");
                }
                if bits & 16 != 0 {
                    config = config.with_client_key_file("client-key.pem");
                }
                if bits & 32 != 0 {
                    config = config.with_tls_server_name("server.dc1.consul");
                }
                config
            })
            .collect()
    }

    #[test]
    fn plain_config() {
        assert_eq!(
            render(&SidecarConfig::default()),
            "export CONSUL_HTTP_ADDR=\"${HOST_IP}:8500\"\n\
             /consul/connect-inject/consul services deregister \\\n  \
             /consul/connect-inject/service.hcl"
        );
    }

    #[test]
    fn auth_method_without_tls() {
        assert_eq!(
            render(&SidecarConfig::default().with_auth_method("k8s-auth-method")),
            "export CONSUL_HTTP_ADDR=\"${HOST_IP}:8500\"\n\
             /consul/connect-inject/consul services deregister \\\n  \
             -token-file=\"/consul/connect-inject/acl-token\" \\\n  \
             /consul/connect-inject/service.hcl \\\n\
             && /consul/connect-inject/consul logout \\\n  \
             -token-file=\"/consul/connect-inject/acl-token\""
        );
    }

    #[test]
    fn fully_configured() {
        let config = SidecarConfig::default()
            .with_auth_method("k8s-auth-method")
            .with_cert_volume("consul-tls")
            .with_ca_file("ca.pem")
            .with_client_cert_file("client.pem")
            .with_client_key_file("client-key.pem")
            .with_tls_server_name("server.dc1.consul");
        assert_eq!(
            render(&config),
            "export CONSUL_HTTP_ADDR=\"https://${HOST_IP}:8501\"\n\
             export CONSUL_TLS_SERVER_NAME=\"server.dc1.consul\"\n\
             /consul/connect-inject/consul services deregister \\\n  \
             -token-file=\"/consul/connect-inject/acl-token\" \\\n  \
             -ca-file=\"/consul/connect-inject/tls/ca.crt\" \\\n  \
             -client-cert=\"/consul/connect-inject/tls/tls.crt\" \\\n  \
             -client-key=\"/consul/connect-inject/tls/tls.key\" \\\n  \
             /consul/connect-inject/service.hcl \\\n\
             && /consul/connect-inject/consul logout \\\n  \
             -ca-file=\"/consul/connect-inject/tls/ca.crt\" \\\n  \
             -client-cert=\"/consul/connect-inject/tls/tls.crt\" \\\n  \
             -client-key=\"/consul/connect-inject/tls/tls.key\" \\\n  \
             -token-file=\"/consul/connect-inject/acl-token\""
        );
    }

    #[test]
    fn cert_volume_without_auth_method_has_no_logout() {
        let config = SidecarConfig::default()
            .with_cert_volume("consul-tls")
            .with_ca_file("ca.pem");
        let script = render(&config);
        assert!(script.contains("-ca-file="));
        assert!(!script.contains("-token-file"));
        assert!(!script.contains("logout"));
    }

    #[test]
    fn tls_flags_are_independent() {
        let config = SidecarConfig::default()
            .with_cert_volume("consul-tls")
            .with_client_key_file("client-key.pem");
        let script = render(&config);
        assert!(script.contains("-client-key="));
        assert!(!script.contains("-ca-file="));
        assert!(!script.contains("-client-cert="));
    }

    #[test]
    fn tls_file_fields_ignored_without_cert_volume() {
        let config = SidecarConfig::default()
            .with_auth_method("k8s-auth-method")
            .with_ca_file("ca.pem")
            .with_client_cert_file("client.pem")
            .with_tls_server_name("server.dc1.consul");
        let script = render(&config);
        assert!(script.starts_with("export CONSUL_HTTP_ADDR=\"${HOST_IP}:8500\""));
        assert!(!script.contains("CONSUL_TLS_SERVER_NAME"));
        assert!(!script.contains("/tls/"));
    }

    #[test]
    fn address_export_follows_cert_volume() {
        for config in all_configs() {
            let script = render(&config);
            let first = script.lines().next().unwrap();
            if config.tls_enabled() {
                assert_eq!(first, "export CONSUL_HTTP_ADDR=\"https://${HOST_IP}:8501\"");
                assert_eq!(
                    script.contains("export CONSUL_TLS_SERVER_NAME=\"server.dc1.consul\""),
                    config.tls_server_name().is_some(),
                    "{config:?}"
                );
            } else {
                assert_eq!(first, "export CONSUL_HTTP_ADDR=\"${HOST_IP}:8500\"");
                assert!(!script.contains("-ca-file"), "{config:?}");
                assert!(!script.contains("-client-cert"), "{config:?}");
                assert!(!script.contains("-client-key"), "{config:?}");
                assert!(!script.contains("CONSUL_TLS_SERVER_NAME"), "{config:?}");
            }
        }
    }

    #[test]
    fn token_flag_and_logout_follow_auth_method() {
        for config in all_configs() {
            let script = render(&config);
            let (deregister, logout) = match script.split_once("&& ") {
                Some((d, l)) => (d, Some(l)),
                None => (script.as_str(), None),
            };
            match config.auth_method() {
                Some(_) => {
                    assert!(deregister.contains("-token-file="), "{config:?}");
                    let logout = logout.expect("logout step");
                    assert!(logout.starts_with("/consul/connect-inject/consul logout"));
                    assert!(logout.ends_with("-token-file=\"/consul/connect-inject/acl-token\""));
                }
                None => {
                    assert!(!script.contains("-token-file"), "{config:?}");
                    assert!(logout.is_none(), "{config:?}");
                }
            }
        }
    }

    #[test]
    fn logout_carries_same_tls_flags_as_deregister() {
        for config in all_configs().into_iter().filter(|c| c.auth_method().is_some()) {
            let script = render(&config);
            let (deregister, logout) = script.split_once("&& ").unwrap();
            for flag in ["-ca-file=", "-client-cert=", "-client-key="] {
                assert_eq!(
                    deregister.contains(flag),
                    logout.contains(flag),
                    "{flag} in {config:?}"
                );
            }
        }
    }

    #[test]
    fn every_continued_line_ends_with_backslash() {
        for config in all_configs() {
            let script = render(&config);
            let lines: Vec<&str> = script.lines().collect();
            let start = lines
                .iter()
                .position(|l| l.contains("services deregister"))
                .unwrap();
            for line in &lines[start..lines.len() - 1] {
                assert!(line.ends_with(" \\"), "{line:?} in {config:?}");
            }
            assert!(!lines[lines.len() - 1].ends_with('\\'));
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        for config in all_configs() {
            assert_eq!(render(&config), render(&config));
        }
    }

    #[test]
    fn rejects_server_name_that_escapes_quotes() {
        for bad in ["evil\"; rm -rf /", "a$(id)", "back`tick`", "line\nbreak", "slash\\"] {
            let config = SidecarConfig::default()
                .with_cert_volume("consul-tls")
                .with_tls_server_name(bad);
            let err = render_pre_stop_script(&config).unwrap_err();
            assert!(
                matches!(err, SidecarError::Script { field: "tlsServerName", .. }),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn unsafe_server_name_ignored_without_cert_volume() {
        let config = SidecarConfig::default().with_tls_server_name("evil\"");
        assert!(render_pre_stop_script(&config).is_ok());
    }
}
