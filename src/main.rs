//! gdelt-dl binary

mod cli;

use clap::Parser;
use cli::Args;
use gdelt_dl::{Watcher, run_with_shutdown};
use std::process::ExitCode;
use tracing::{Level, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let watcher = match Watcher::new(config) {
        Ok(watcher) => watcher,
        Err(e) => {
            error!(error = %e, "failed to start watcher");
            return ExitCode::FAILURE;
        }
    };

    match run_with_shutdown(watcher).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "watcher stopped on error");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.as_str()))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
