//! Command implementations

mod config;
mod convert;
mod downsample;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;
use lidarprep_core::StopSignal;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Downsample(args) => downsample::execute(args, config_path, &output).await,
        Commands::Convert(args) => convert::execute(args, config_path, &output).await,
        Commands::Config => config::execute(config_path, &output),
    }
}

/// Raise `stop` on the first Ctrl-C
fn stop_on_ctrl_c(stop: StopSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current records");
            stop.stop();
        }
    });
}
