//! Render-sidecar command
//!
//! Prints the Envoy sidecar container and the volumes it needs for a given
//! configuration, in the shape the injector patches into pods.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tracing::info;

use meshinject_common::DEFAULT_NAMESPACE;
use meshinject_sidecar::secret::{verify_cert_secret, KubeSecretSource};
use meshinject_sidecar::{build_sidecar, InjectedSidecar, SidecarConfig};

use crate::{Error, Result};

/// Output encoding
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Render-sidecar command arguments
#[derive(Args, Debug)]
pub struct RenderSidecarArgs {
    /// Envoy image for the sidecar container
    #[arg(long)]
    pub image: String,

    /// YAML or JSON file with a sidecar config; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Consul ACL auth method; adds token flags and a logout step
    #[arg(long)]
    pub auth_method: Option<String>,

    /// Secret holding the Consul client TLS material
    #[arg(long)]
    pub cert_volume: Option<String>,

    /// Key of the CA certificate in the cert secret
    #[arg(long)]
    pub ca_file: Option<String>,

    /// Key of the client certificate in the cert secret
    #[arg(long)]
    pub client_cert: Option<String>,

    /// Key of the client private key in the cert secret
    #[arg(long)]
    pub client_key: Option<String>,

    /// TLS server name to verify on the Consul agent
    #[arg(long)]
    pub tls_server_name: Option<String>,

    /// Check that the cert secret exists and has every configured key
    #[arg(long)]
    pub verify_secret: bool,

    /// Namespace to look up the cert secret in
    #[arg(long, short = 'n', default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Path to kubeconfig (only used with --verify-secret)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,
}

impl RenderSidecarArgs {
    /// Merge the optional config file with the flags
    pub fn sidecar_config(&self) -> Result<SidecarConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_yaml::from_str(&raw)?
            }
            None => SidecarConfig::default(),
        };

        let overrides = [
            (&mut config.auth_method, &self.auth_method),
            (&mut config.cert_volume, &self.cert_volume),
            (&mut config.ca_file, &self.ca_file),
            (&mut config.client_cert_file, &self.client_cert),
            (&mut config.client_key_file, &self.client_key),
            (&mut config.tls_server_name, &self.tls_server_name),
        ];
        for (field, flag) in overrides {
            if flag.is_some() {
                *field = flag.clone();
            }
        }
        Ok(config)
    }
}

/// Serialize the rendered sidecar
pub fn render(sidecar: &InjectedSidecar, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(sidecar)?,
        OutputFormat::Json => serde_json::to_string_pretty(sidecar)?,
    })
}

/// Run the render-sidecar command
pub async fn run(args: RenderSidecarArgs) -> Result<()> {
    if args.image.trim().is_empty() {
        return Err(Error::usage("--image must not be empty"));
    }
    let config = args.sidecar_config()?;
    if args.verify_secret && config.cert_volume().is_none() {
        return Err(Error::usage("--verify-secret requires a cert volume"));
    }

    // Render before any cluster call so a bad config fails fast
    let sidecar = build_sidecar(&config, &args.image)?;

    if args.verify_secret {
        let client = super::kube_client(args.kubeconfig.as_deref()).await?;
        verify_cert_secret(&KubeSecretSource::new(client), &args.namespace, &config).await?;
        info!(
            namespace = %args.namespace,
            secret = config.cert_volume().unwrap_or_default(),
            "cert secret verified"
        );
    }

    print!("{}", render(&sidecar, args.output)?);
    if args.output == OutputFormat::Json {
        println!();
    }
    Ok(())
}
