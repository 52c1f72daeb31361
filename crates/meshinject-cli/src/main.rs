//! meshinject CLI
//!
//! Sidecar rendering and Job cleanup helpers for mesh injection.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use meshinject_cli::{exit_status, Cli};
use meshinject_common::telemetry::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    // try_parse so that usage errors exit 1 rather than clap's 2
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if e.print().is_err() {
                eprintln!("{}", e);
            }
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = init_logging(&cli.telemetry_config()) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = cli.run().await;
    if let Err(e) = &result {
        error!(error = %e, "command failed");
        eprintln!("error: {}", e);
    }
    ExitCode::from(exit_status(&result))
}
