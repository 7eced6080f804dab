//! lidarprep CLI - Command-line interface
//!
//! Thin adapter that turns command-line arguments into core batch jobs and
//! renders their progress.

mod cli;
mod commands;
mod config_loader;
mod errors;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use errors::CliError;

fn main() -> Result<()> {
    // Initialize tracing; core log events are already rendered by the CLI
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,lidarprep_core=warn")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Create async runtime
    let runtime = tokio::runtime::Runtime::new()?;

    // Execute the command
    if let Err(error) = runtime.block_on(commands::execute(cli)) {
        match error.downcast::<CliError>() {
            Ok(cli_error) => cli_error.display(),
            Err(other) => errors::from_anyhow(other).display(),
        }
        std::process::exit(1);
    }

    Ok(())
}
