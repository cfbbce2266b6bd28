//! # GreenFis
//!
//! Entry point for the `greenfis` binary.
//!
//! ```text
//! greenfis init
//! greenfis create-user --username admin --full-name "Store Owner" --password ...
//! greenfis serve --port 8080 --api-key ... --cors-origin http://localhost:5173
//! ```

use clap::Parser;
use greenfis::cli::{self, Cli};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "greenfis=info,greenfis_core=info,tower_http=info";

#[tokio::main]
async fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // Logs go to stderr so `status --json` and friends stay pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
