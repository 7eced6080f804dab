use crate::cli::ConvertArgs;
use crate::config_loader::load_config_with_overrides;
use crate::errors;
use crate::output::{ConsoleSink, OutputWriter};
use anyhow::Result;
use lidarprep_core::config::CliConfigOverrides;
use lidarprep_core::convert::{convert_directory, ConvertOptions, ConvertOutcome};
use lidarprep_core::logging::RunLog;
use lidarprep_core::StopSignal;
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;

use super::stop_on_ctrl_c;

#[derive(Tabled)]
struct DirectoryRow {
    #[tabled(rename = "Directory")]
    directory: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Files")]
    files: String,
    #[tabled(rename = "Points")]
    points: String,
}

pub async fn execute(args: ConvertArgs, config_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let overrides = CliConfigOverrides {
        workers: args.workers,
        log_dir: args.log_dir,
        ..Default::default()
    };
    let config = load_config_with_overrides(config_path, overrides)?;

    let history = config.log_dir.value.as_ref().map(RunLog::new);
    let sink = Arc::new(ConsoleSink::new(*output, history));
    let options = ConvertOptions { workers: config.workers.value };

    let stop = StopSignal::new();
    stop_on_ctrl_c(stop.clone());

    let summary = convert_directory(&args.input, &args.output, &options, sink, stop)
        .await
        .map_err(errors::from_core)?;

    if output.is_json() {
        return output.result(&summary);
    }

    if summary.total > 0 {
        output.section("Conversion Summary");
        output.kv("Directories", summary.total);
        output.kv("Converted", summary.converted);
        output.kv("Failed", summary.failed);
        output.kv("Aborted", summary.aborted);

        let mut rows: Vec<DirectoryRow> = summary
            .results
            .iter()
            .map(|report| {
                let (status, files, points) = match &report.outcome {
                    ConvertOutcome::Converted { files, points, .. } => {
                        ("converted", files.to_string(), points.to_string())
                    }
                    ConvertOutcome::Failed { .. } => ("failed", "-".to_string(), "-".to_string()),
                    ConvertOutcome::Aborted { .. } => ("aborted", "-".to_string(), "-".to_string()),
                };
                DirectoryRow {
                    directory: report.directory.clone(),
                    status: status.to_string(),
                    files,
                    points,
                }
            })
            .collect();

        rows.sort_by(|a, b| a.directory.cmp(&b.directory));
        output.table(rows);
    }

    Ok(())
}
