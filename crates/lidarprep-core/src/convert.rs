//! Raw LiDAR export conversion
//!
//! Every sub-directory of the input holds the per-track CSV exports of one
//! acquisition. All of them are merged into a single indexed-text file named
//! after the sub-directory, keeping only strong-beam, high-confidence ground
//! photons. Coordinate text is copied as-is, so no precision is lost.

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cancel::StopSignal;
use crate::config::default_workers;
use crate::error::{LidarError, Result};
use crate::formats::csv::{column_index, HEIGHT_COLUMN, LAT_COLUMN, LON_COLUMN};
use crate::formats::PROGRESS_INTERVAL;
use crate::logging::LogSink;

pub const CLASSIFICATION_COLUMN: &str = "classification";
pub const SIGNAL_CONF_COLUMN: &str = "signal_conf_ph";
pub const BEAM_STRENGTH_COLUMN: &str = "beam_strength";

/// Photons at or below this confidence are dropped
const MIN_SIGNAL_CONFIDENCE: i64 = 2;
const GROUND_CLASS: i64 = 1;
const STRONG_BEAM: &str = "strong";

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Maximum number of sub-directories converted at the same time
    pub workers: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self { workers: default_workers() }
    }
}

/// Result of converting one sub-directory
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConvertOutcome {
    Converted { files: usize, points: usize, output: PathBuf },
    Failed { error: String },
    /// Stopped on request; `output` is set when a partial file was left behind
    Aborted { output: Option<PathBuf> },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertReport {
    pub directory: String,
    pub outcome: ConvertOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvertSummary {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    pub aborted: usize,
    pub results: Vec<ConvertReport>,
}

impl ConvertSummary {
    fn record(&mut self, report: ConvertReport) {
        match report.outcome {
            ConvertOutcome::Converted { .. } => self.converted += 1,
            ConvertOutcome::Failed { .. } => self.failed += 1,
            ConvertOutcome::Aborted { .. } => self.aborted += 1,
        }
        self.results.push(report);
    }
}

/// One kept photon, coordinates as written in the source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPoint {
    pub latitude: String,
    pub longitude: String,
    pub height: String,
}

struct ConvertColumns {
    lat: usize,
    lon: usize,
    height: usize,
    classification: usize,
    signal_conf: usize,
    beam_strength: usize,
}

impl ConvertColumns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        Ok(Self {
            lat: column_index(headers, LAT_COLUMN)?,
            lon: column_index(headers, LON_COLUMN)?,
            height: column_index(headers, HEIGHT_COLUMN)?,
            classification: column_index(headers, CLASSIFICATION_COLUMN)?,
            signal_conf: column_index(headers, SIGNAL_CONF_COLUMN)?,
            beam_strength: column_index(headers, BEAM_STRENGTH_COLUMN)?,
        })
    }

    fn max_index(&self) -> usize {
        [self.lat, self.lon, self.height, self.classification, self.signal_conf, self.beam_strength]
            .into_iter()
            .max()
            .unwrap_or(0)
    }

    /// Apply the quality filter; short rows and non-integer flags are dropped
    fn keep(&self, row: &StringRecord) -> Option<RawPoint> {
        if row.len() <= self.max_index() {
            return None;
        }
        if &row[self.beam_strength] != STRONG_BEAM {
            return None;
        }
        let confidence: i64 = row[self.signal_conf].trim().parse().ok()?;
        let class: i64 = row[self.classification].trim().parse().ok()?;
        if confidence <= MIN_SIGNAL_CONFIDENCE || class != GROUND_CLASS {
            return None;
        }

        Some(RawPoint {
            latitude: row[self.lat].to_string(),
            longitude: row[self.lon].to_string(),
            height: row[self.height].to_string(),
        })
    }
}

/// Read one raw export and return the photons passing the quality filter
pub fn filter_csv_file(path: &Path) -> Result<Vec<RawPoint>> {
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let columns = ConvertColumns::resolve(&headers)?;

    let mut kept = Vec::new();
    for row in reader.records() {
        if let Some(point) = columns.keep(&row?) {
            kept.push(point);
        }
    }
    Ok(kept)
}

/// Merge every `*.csv` directly inside `dir` into one indexed-text file
pub fn merge_csv_directory(dir: &Path, output: &Path, stop: &StopSignal) -> Result<ConvertOutcome> {
    let mut csv_files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("csv"))
        .collect();
    csv_files.sort();

    if csv_files.is_empty() {
        return Err(LidarError::NoCsvFiles { path: dir.to_path_buf() });
    }

    let mut points = Vec::new();
    for file in &csv_files {
        stop.check()?;
        let kept = filter_csv_file(file)?;
        tracing::debug!(file = %file.display(), kept = kept.len(), "filtered raw export");
        points.extend(kept);
    }

    if stop.is_stopped() {
        return Ok(ConvertOutcome::Aborted { output: None });
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(output)?);
    writeln!(writer, "{}", points.len())?;

    for (i, point) in points.iter().enumerate() {
        if stop.is_stopped() {
            writer.flush()?;
            return Ok(ConvertOutcome::Aborted { output: Some(output.to_path_buf()) });
        }
        writeln!(writer, "{}\t{}\t{}\t{}", i + 1, point.latitude, point.longitude, point.height)?;

        if (i + 1) % PROGRESS_INTERVAL == 0 {
            tracing::debug!("written {} points", i + 1);
        }
    }
    writer.flush()?;

    Ok(ConvertOutcome::Converted {
        files: csv_files.len(),
        points: points.len(),
        output: output.to_path_buf(),
    })
}

/// Convert every immediate sub-directory of `input` into `output/{name}.txt`.
///
/// At most `options.workers` sub-directories are converted at the same time.
pub async fn convert_directory(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
    sink: Arc<dyn LogSink>,
    stop: StopSignal,
) -> Result<ConvertSummary> {
    if !input.is_dir() {
        return Err(LidarError::InputDirNotFound { path: input.to_path_buf() });
    }

    let mut directories: Vec<PathBuf> = fs::read_dir(input)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    directories.sort();

    let mut summary = ConvertSummary { total: directories.len(), ..Default::default() };
    if directories.is_empty() {
        sink.warning(format!("no sub-directories to convert in {}", input.display()));
    }

    let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
    let mut running = JoinSet::new();

    for dir in directories {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        let target = output.join(format!("{}.txt", name));
        let semaphore = semaphore.clone();
        let stop = stop.clone();

        running.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let outcome = tokio::task::spawn_blocking(move || {
                merge_csv_directory(&dir, &target, &stop)
            })
            .await
            .unwrap_or_else(|e| Err(std::io::Error::other(format!("worker panicked: {}", e)).into()));
            (name, outcome)
        });
    }

    while let Some(joined) = running.join_next().await {
        let (directory, result) = match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Conversion task failed to join: {}", e);
                continue;
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(LidarError::Cancelled) => ConvertOutcome::Aborted { output: None },
            Err(e) => ConvertOutcome::Failed { error: e.to_string() },
        };

        match &outcome {
            ConvertOutcome::Converted { files, points, output } => sink.success(format!(
                "converted {}: {} files, {} points -> {}",
                directory,
                files,
                points,
                output.display()
            )),
            ConvertOutcome::Failed { error } => {
                sink.error(format!("conversion failed for {}: {}", directory, error))
            }
            ConvertOutcome::Aborted { .. } => {
                sink.warning(format!("conversion of {} stopped", directory))
            }
        }

        summary.record(ConvertReport { directory, outcome });
    }

    sink.info("all conversion tasks finished");
    Ok(summary)
}
