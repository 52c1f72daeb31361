//! meshinject CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};
use meshinject_common::telemetry::{LogFormat, TelemetryConfig};

/// meshinject - service mesh sidecar injection helpers
#[derive(Parser, Debug)]
#[command(name = "meshinject")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level or filter directive (RUST_LOG overrides it)
    #[arg(long, global = true, env = "MESHINJECT_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for a Job to finish and delete it if it succeeded
    DeleteCompletedJob(commands::delete_completed_job::DeleteCompletedJobArgs),
    /// Print the proxy sidecar container and volumes for a config
    RenderSidecar(commands::render_sidecar::RenderSidecarArgs),
}

/// Process exit status for a command result: 0 on success, 1 on any error
pub fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

impl Cli {
    /// Logging settings from the global flags
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            level: self.log_level.clone(),
            format: if self.log_json {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
        }
    }

    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::DeleteCompletedJob(args) => commands::delete_completed_job::run(args).await,
            Commands::RenderSidecar(args) => commands::render_sidecar::run(args).await,
        }
    }
}
