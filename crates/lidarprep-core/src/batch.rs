//! Batch coordinator
//!
//! Validates a [`DownsampleJob`], enumerates its input directory and runs the
//! per-file pipeline for every eligible file on a bounded pool of blocking
//! workers. Progress flows back to the caller as [`BatchEvent`]s over an
//! unbounded channel; the batch ends with exactly one terminal event.

use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::cancel::StopSignal;
use crate::config::LayeredConfig;
use crate::error::Result;
use crate::formats::FormatRegistry;
use crate::logging::{LogEvent, LogLevel, LogSink, RunLog};
use crate::models::{DownsampleJob, FileTask, MethodParam};
use crate::pipeline::{process_file, FileOutcome, PipelineStage};
use crate::sampling::SamplingOptions;

/// Event streamed from a running batch
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Log(LogEvent),
    FileFinished(FileReport),
    /// Every file reported and no stop was requested
    Completed(BatchSummary),
    /// Every file reported after a stop request
    Cancelled(BatchSummary),
}

impl BatchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchEvent::Completed(_) | BatchEvent::Cancelled(_))
    }
}

/// Log sink feeding the batch event stream, optionally mirrored to a run-history file
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<BatchEvent>,
    history: Option<Arc<RunLog>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<BatchEvent>) -> Self {
        Self { tx, history: None }
    }

    pub fn with_history(mut self, history: Arc<RunLog>) -> Self {
        self.history = Some(history);
        self
    }

    /// Forward a non-log event; a dropped receiver is not an error
    pub fn send(&self, event: BatchEvent) {
        let _ = self.tx.send(event);
    }
}

impl LogSink for ChannelSink {
    fn emit(&self, event: LogEvent) {
        event.trace();
        if let Some(history) = &self.history {
            history.log(&event);
        }
        self.send(BatchEvent::Log(event));
    }
}

/// Outcome of one file together with its place in the batch
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub path: PathBuf,
    pub outcome: FileOutcome,
    /// Number of files finished when this one reported, including itself
    pub completed: usize,
    pub total: usize,
}

/// Outcome counts for a whole batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Total files dispatched
    pub total: usize,
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
    pub aborted: usize,
    pub results: Vec<FileReport>,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self { total, ..Self::default() }
    }

    pub fn record(&mut self, report: FileReport) {
        match report.outcome {
            FileOutcome::Done { .. } => self.done += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
            FileOutcome::Aborted { .. } => self.aborted += 1,
        }
        self.results.push(report);
    }

    /// Number of files that reported any outcome
    pub fn finished(&self) -> usize {
        self.done + self.skipped + self.failed + self.aborted
    }

    /// Check that every dispatched file reported exactly once
    pub fn is_complete(&self) -> bool {
        self.finished() == self.total && self.results.len() == self.total
    }
}

/// Regular files directly under the job's input directory that some reader
/// accepts, sorted by file name
pub fn discover_files(job: &DownsampleJob, registry: &FormatRegistry) -> Result<Vec<FileTask>> {
    let mut tasks = Vec::new();

    for entry in fs::read_dir(&job.input_path)? {
        let path = entry?.path();

        // Skip non-files
        if !path.is_file() {
            continue;
        }

        if let Ok(reader) = registry.detect_format(&path) {
            tasks.push(FileTask {
                output_path: job.output_file_for(&path),
                format: reader.format(),
                path,
            });
        }
    }

    tasks.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(tasks)
}

/// Handle to a running batch
pub struct BatchHandle {
    events: mpsc::UnboundedReceiver<BatchEvent>,
    stop: StopSignal,
    join: Option<JoinHandle<BatchSummary>>,
}

impl BatchHandle {
    /// Request cooperative cancellation; running files stop at their next poll
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Shared stop signal, e.g. for a Ctrl-C handler
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Next event, or `None` once the batch finished and the stream is drained
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Drain all events and return the final summary
    pub async fn wait(mut self) -> BatchSummary {
        let mut summary = None;
        while let Some(event) = self.events.recv().await {
            if let BatchEvent::Completed(s) | BatchEvent::Cancelled(s) = event {
                summary = Some(s);
            }
        }

        if let Some(join) = self.join.take() {
            match join.await {
                Ok(s) => return summary.unwrap_or(s),
                Err(e) => tracing::error!("Batch coordinator task failed: {}", e),
            }
        }

        summary.unwrap_or_default()
    }
}

/// Runs downsampling jobs under a layered configuration
pub struct BatchCoordinator {
    config: LayeredConfig,
}

impl BatchCoordinator {
    pub fn new(config: LayeredConfig) -> Self {
        Self { config }
    }

    /// Validate the job and start processing it in the background.
    ///
    /// Configuration errors are returned before any file is touched. Must be
    /// called from within a tokio runtime.
    pub fn start(&self, job: DownsampleJob) -> Result<BatchHandle> {
        self.start_with_stop(job, StopSignal::new())
    }

    /// Like [`BatchCoordinator::start`], sharing an existing stop signal
    pub fn start_with_stop(&self, job: DownsampleJob, stop: StopSignal) -> Result<BatchHandle> {
        let param = job.validate()?;
        let registry = self.config.format_registry();
        let tasks = discover_files(&job, &registry)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx);
        if let Some(dir) = &self.config.log_dir.value {
            sink = sink.with_history(Arc::new(RunLog::new(dir)));
        }

        if tasks.is_empty() {
            let log: &dyn LogSink = &sink;
            log.error(format!(
                "no valid .csv or .txt input files in {}",
                job.input_path.display()
            ));
            sink.send(BatchEvent::Completed(BatchSummary::default()));
            return Ok(BatchHandle { events: rx, stop, join: None });
        }

        let run = BatchRun {
            tasks,
            param,
            registry: Arc::new(registry),
            options: self.config.sampling_options(),
            workers: self.config.workers.value.max(1),
            stop: stop.clone(),
            sink: Arc::new(sink),
        };
        let join = tokio::spawn(run.execute());

        Ok(BatchHandle { events: rx, stop, join: Some(join) })
    }
}

struct BatchRun {
    tasks: Vec<FileTask>,
    param: MethodParam,
    registry: Arc<FormatRegistry>,
    options: SamplingOptions,
    workers: usize,
    stop: StopSignal,
    sink: Arc<ChannelSink>,
}

impl BatchRun {
    async fn execute(self) -> BatchSummary {
        let total = self.tasks.len();
        let log: &dyn LogSink = self.sink.as_ref();
        log.info(format!(
            "processing {} files with {} ({}), {} workers",
            total,
            self.param.method(),
            self.param,
            self.workers
        ));

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut running = JoinSet::new();

        for task in self.tasks {
            let semaphore = semaphore.clone();
            let registry = self.registry.clone();
            let options = self.options.clone();
            let stop = self.stop.clone();
            let sink = self.sink.clone();
            let param = self.param;

            running.spawn(async move {
                // files not yet admitted still run and observe the stop signal at their first poll
                let _permit = semaphore.acquire_owned().await;
                let worker_task = task.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    process_file(&worker_task, &param, &registry, &options, &stop, sink.as_ref())
                })
                .await
                .unwrap_or_else(|e| FileOutcome::Failed {
                    stage: PipelineStage::Sampling,
                    error: format!("worker panicked: {}", e),
                });
                (task, outcome)
            });
        }

        let mut summary = BatchSummary::new(total);
        while let Some(joined) = running.join_next().await {
            let (task, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("File task failed to join: {}", e);
                    continue;
                }
            };

            let completed = summary.finished() + 1;
            let name = task.display_name();
            log.emit(LogEvent::new(
                outcome.level(),
                format!("[{}/{}] {}", completed, total, outcome.describe(&name)),
            ));

            let report = FileReport { file: name, path: task.path, outcome, completed, total };
            self.sink.send(BatchEvent::FileFinished(report.clone()));
            summary.record(report);
        }

        log.info(format!("all {} files processed", total));

        if self.stop.is_stopped() {
            log.emit(LogEvent::new(LogLevel::Warning, "batch stopped on request"));
            self.sink.send(BatchEvent::Cancelled(summary.clone()));
        } else {
            self.sink.send(BatchEvent::Completed(summary.clone()));
        }

        summary
    }
}
