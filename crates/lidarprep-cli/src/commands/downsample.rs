use crate::cli::DownsampleArgs;
use crate::config_loader::load_config_with_overrides;
use crate::errors;
use crate::output::OutputWriter;
use crate::progress::FileProgress;
use anyhow::Result;
use lidarprep_core::batch::{BatchCoordinator, BatchEvent, BatchSummary};
use lidarprep_core::config::CliConfigOverrides;
use lidarprep_core::{DownsampleJob, FileOutcome};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::stop_on_ctrl_c;

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Points In")]
    input_points: String,
    #[tabled(rename = "Points Out")]
    output_points: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Output for the downsample command
#[derive(Debug, Serialize)]
struct DownsampleOutput<'a> {
    method: String,
    param: String,
    cancelled: bool,
    summary: &'a BatchSummary,
}

pub async fn execute(
    args: DownsampleArgs,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    let overrides = CliConfigOverrides {
        workers: args.workers,
        seed: args.seed,
        on_malformed: args.on_malformed,
        log_dir: args.log_dir,
    };
    let config = load_config_with_overrides(config_path, overrides)?;

    let param = args.param.unwrap_or_else(|| args.method.default_param().to_string());
    let job = DownsampleJob {
        method: args.method,
        param: param.clone(),
        input_path: args.input,
        output_path: args.output,
        filename_prefix: args.prefix,
    };

    let coordinator = BatchCoordinator::new(config);
    let mut handle = coordinator.start(job).map_err(errors::from_core)?;
    stop_on_ctrl_c(handle.stop_signal());

    let progress = FileProgress::new(!output.is_json() && !args.no_progress);
    let mut terminal = None;

    while let Some(event) = handle.next_event().await {
        match event {
            BatchEvent::Log(log) => progress.suspend(|| output.log_event(&log)),
            BatchEvent::FileFinished(report) => {
                progress.file_finished(report.completed, report.total)
            }
            BatchEvent::Completed(summary) => terminal = Some((summary, false)),
            BatchEvent::Cancelled(summary) => terminal = Some((summary, true)),
        }
    }

    let (summary, cancelled) = terminal.unwrap_or_default();
    progress.finish(cancelled, summary.finished(), summary.total);

    if output.is_json() {
        return output.result(DownsampleOutput {
            method: args.method.to_string(),
            param,
            cancelled,
            summary: &summary,
        });
    }

    display_summary(&summary, output);
    if cancelled {
        output.warning("Batch stopped before every file finished");
    }

    Ok(())
}

fn display_summary(summary: &BatchSummary, output: &OutputWriter) {
    if summary.total == 0 {
        return;
    }

    output.section("Downsampling Summary");
    output.kv("Total Files", summary.total);
    output.kv("Done", summary.done);
    output.kv("Skipped", summary.skipped);
    output.kv("Failed", summary.failed);
    output.kv("Aborted", summary.aborted);

    let mut rows: Vec<FileRow> = summary
        .results
        .iter()
        .map(|report| {
            let (status, input_points, output_points, detail) = match &report.outcome {
                FileOutcome::Done { input_points, output_points, output } => (
                    "done",
                    input_points.to_string(),
                    output_points.to_string(),
                    output.display().to_string(),
                ),
                FileOutcome::Skipped { reason } => ("skipped", "0".into(), "-".into(), reason.clone()),
                FileOutcome::Failed { stage, error } => {
                    ("failed", "-".into(), "-".into(), format!("{}: {}", stage, error))
                }
                FileOutcome::Aborted { output } => (
                    "aborted",
                    "-".into(),
                    "-".into(),
                    output
                        .as_ref()
                        .map(|p| format!("partial {}", p.display()))
                        .unwrap_or_default(),
                ),
            };
            FileRow { file: report.file.clone(), status: status.to_string(), input_points, output_points, detail }
        })
        .collect();

    // Sort by file name for consistent output
    rows.sort_by(|a, b| a.file.cmp(&b.file));
    output.table(rows);
}
