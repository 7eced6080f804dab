//! Per-file downsampling pipeline
//!
//! One input file flows through `Reading → Sampling → Writing` and ends in a
//! [`FileOutcome`]. The pipeline never returns an error: every failure is
//! folded into the outcome so a batch can keep going with the other files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::cancel::StopSignal;
use crate::error::LidarError;
use crate::formats::{FormatRegistry, WriteOutcome};
use crate::logging::{LogEvent, LogLevel, LogSink};
use crate::models::{FileTask, MethodParam};
use crate::sampling::{self, SamplingOptions};

/// Non-terminal stage of the per-file pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Reading,
    Sampling,
    Writing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Reading => f.write_str("reading"),
            PipelineStage::Sampling => f.write_str("sampling"),
            PipelineStage::Writing => f.write_str("writing"),
        }
    }
}

/// Terminal state of one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    Done {
        input_points: usize,
        output_points: usize,
        output: PathBuf,
    },
    Skipped {
        reason: String,
    },
    Failed {
        stage: PipelineStage,
        error: String,
    },
    /// Stopped on request; `output` is set when a partial file was left behind
    Aborted {
        output: Option<PathBuf>,
    },
}

impl FileOutcome {
    fn failed(stage: PipelineStage, error: LidarError) -> Self {
        FileOutcome::Failed { stage, error: error.to_string() }
    }

    pub fn level(&self) -> LogLevel {
        match self {
            FileOutcome::Done { .. } => LogLevel::Success,
            FileOutcome::Skipped { .. } => LogLevel::Info,
            FileOutcome::Failed { .. } => LogLevel::Error,
            FileOutcome::Aborted { .. } => LogLevel::Warning,
        }
    }

    /// Log line describing this outcome for the named file
    pub fn describe(&self, name: &str) -> String {
        match self {
            FileOutcome::Done { input_points, output_points, output } => format!(
                "{}: {} points in, {} points out, saved to {}",
                name,
                input_points,
                output_points,
                output.display()
            ),
            FileOutcome::Skipped { reason } => format!("{} skipped: {}", name, reason),
            FileOutcome::Failed { stage, error } => {
                format!("{} failed while {}: {}", name, stage, error)
            }
            FileOutcome::Aborted { output: Some(path) } => {
                format!("{} stopped, partial output left at {}", name, path.display())
            }
            FileOutcome::Aborted { output: None } => format!("{} stopped before writing", name),
        }
    }

    pub fn log_event(&self, name: &str) -> LogEvent {
        LogEvent::new(self.level(), self.describe(name))
    }
}

/// Run one file through read, sample and write.
///
/// The stop signal is polled before reading and again before writing; the
/// strategies and writers poll it on their own inside their loops.
pub fn process_file(
    task: &FileTask,
    param: &MethodParam,
    registry: &FormatRegistry,
    options: &SamplingOptions,
    stop: &StopSignal,
    sink: &dyn LogSink,
) -> FileOutcome {
    let name = task.display_name();

    if stop.is_stopped() {
        return FileOutcome::Aborted { output: None };
    }

    // Reading
    let reader = match registry.detect_format(&task.path) {
        Ok(reader) => reader,
        Err(e) => return FileOutcome::failed(PipelineStage::Reading, e),
    };
    sink.info(format!("reading {} ({})", name, reader.format_name()));

    let collection = match reader.read(&task.path) {
        Ok(collection) => collection,
        Err(e) => return FileOutcome::failed(PipelineStage::Reading, e),
    };
    if collection.is_empty() {
        return FileOutcome::Skipped { reason: "no valid points".to_string() };
    }
    let input_points = collection.len();
    tracing::debug!(file = %name, points = input_points, "read points");

    // Sampling
    let reduced = match sampling::downsample(&collection, param, options, stop) {
        Ok(reduced) => reduced,
        Err(LidarError::Cancelled) => return FileOutcome::Aborted { output: None },
        Err(e) => return FileOutcome::failed(PipelineStage::Sampling, e),
    };
    tracing::debug!(file = %name, method = %param.method(), points = reduced.len(), "sampled points");

    // Writing
    if stop.is_stopped() {
        return FileOutcome::Aborted { output: None };
    }

    let Some(writer) = registry.writer_for(reduced.source_format) else {
        return FileOutcome::Failed {
            stage: PipelineStage::Writing,
            error: format!("no writer registered for {}", reduced.source_format),
        };
    };

    if let Some(parent) = task.output_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            return FileOutcome::failed(PipelineStage::Writing, e.into());
        }
    }

    match writer.write(&task.output_path, &reduced.points, stop) {
        Ok(WriteOutcome::Completed { written }) => FileOutcome::Done {
            input_points,
            output_points: written,
            output: task.output_path.clone(),
        },
        Ok(WriteOutcome::Aborted { .. }) => {
            FileOutcome::Aborted { output: Some(task.output_path.clone()) }
        }
        Err(e) => FileOutcome::failed(PipelineStage::Writing, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{IndexedTextWriter, PointWriter};
    use crate::logging::CollectingSink;
    use crate::models::{PointRecord, SourceFormat};
    use std::io::{self, Write};
    use std::path::Path;
    use tempfile::TempDir;

    fn task(dir: &Path, name: &str, format: SourceFormat) -> FileTask {
        FileTask {
            path: dir.join(name),
            output_path: dir.join("out").join(format!("downsampled_{}", name)),
            format,
        }
    }

    /// Raises the stop signal once a given number of lines went through
    struct Tripwire<'a> {
        inner: &'a mut dyn Write,
        lines: usize,
        limit: usize,
        stop: StopSignal,
    }

    impl Write for Tripwire<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.write_all(buf)?;
            self.lines += buf.iter().filter(|b| **b == b'\n').count();
            if self.lines >= self.limit {
                self.stop.stop();
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    struct TrippingWriter {
        limit: usize,
        stop: StopSignal,
    }

    impl PointWriter for TrippingWriter {
        fn write_to(
            &self,
            output: &mut dyn Write,
            points: &[PointRecord],
            stop: &StopSignal,
        ) -> crate::Result<WriteOutcome> {
            let mut tripwire =
                Tripwire { inner: output, lines: 0, limit: self.limit, stop: self.stop.clone() };
            IndexedTextWriter.write_to(&mut tripwire, points, stop)
        }

        fn format(&self) -> SourceFormat {
            SourceFormat::IndexedText
        }
    }

    #[test]
    fn test_grid_on_indexed_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.txt"),
            "3\n1\t10.0\t20.0\t5.0\n2\t10.1\t20.1\t5.1\n3\t50.0\t60.0\t9.0\n",
        )
        .unwrap();
        let task = task(dir.path(), "a.txt", SourceFormat::IndexedText);
        let sink = CollectingSink::new();

        let outcome = process_file(
            &task,
            &MethodParam::Grid(1.0),
            &FormatRegistry::default(),
            &SamplingOptions::default(),
            &StopSignal::new(),
            &sink,
        );

        assert_eq!(
            outcome,
            FileOutcome::Done {
                input_points: 3,
                output_points: 2,
                output: task.output_path.clone()
            }
        );
        assert_eq!(
            fs::read_to_string(&task.output_path).unwrap(),
            "2\n1\t10.0\t20.0\t5.0\n2\t50.0\t60.0\t9.0\n"
        );
        assert!(sink.messages().iter().any(|m| m.contains("reading a.txt")));
    }

    #[test]
    fn test_empty_csv_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.csv"), "lat_ph,lon_ph,h_ph\n").unwrap();
        let task = task(dir.path(), "empty.csv", SourceFormat::Csv);

        let outcome = process_file(
            &task,
            &MethodParam::Count(10),
            &FormatRegistry::default(),
            &SamplingOptions::default(),
            &StopSignal::new(),
            &CollectingSink::new(),
        );

        assert!(matches!(outcome, FileOutcome::Skipped { .. }));
        assert!(!task.output_path.exists());
    }

    #[test]
    fn test_missing_column_fails_reading() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.csv"), "lat_ph,lon_ph\n1.0,2.0\n").unwrap();
        let task = task(dir.path(), "bad.csv", SourceFormat::Csv);

        let outcome = process_file(
            &task,
            &MethodParam::Count(10),
            &FormatRegistry::default(),
            &SamplingOptions::default(),
            &StopSignal::new(),
            &CollectingSink::new(),
        );

        match outcome {
            FileOutcome::Failed { stage, error } => {
                assert_eq!(stage, PipelineStage::Reading);
                assert!(error.contains("h_ph"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_stopped_before_reading_writes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "1\n1\t1.0\t2.0\t3.0\n").unwrap();
        let task = task(dir.path(), "a.txt", SourceFormat::IndexedText);
        let stop = StopSignal::new();
        stop.stop();

        let outcome = process_file(
            &task,
            &MethodParam::Count(1),
            &FormatRegistry::default(),
            &SamplingOptions::default(),
            &stop,
            &CollectingSink::new(),
        );

        assert_eq!(outcome, FileOutcome::Aborted { output: None });
        assert!(!task.output_path.exists());
    }

    #[test]
    fn test_stop_after_third_record_leaves_partial_file() {
        let dir = TempDir::new().unwrap();
        let mut content = String::from("10\n");
        for i in 0..10 {
            content.push_str(&format!("{}\t{}.0\t{}.0\t1.0\n", i + 1, i, i));
        }
        fs::write(dir.path().join("tile.txt"), content).unwrap();
        let task = task(dir.path(), "tile.txt", SourceFormat::IndexedText);

        let stop = StopSignal::new();
        let mut registry = FormatRegistry::new();
        registry.register_reader(Box::new(crate::formats::IndexedTextReader::default()));
        // count line plus three records
        registry.register_writer(Box::new(TrippingWriter { limit: 4, stop: stop.clone() }));

        let outcome = process_file(
            &task,
            &MethodParam::Count(10),
            &registry,
            &SamplingOptions::default(),
            &stop,
            &CollectingSink::new(),
        );

        assert_eq!(outcome, FileOutcome::Aborted { output: Some(task.output_path.clone()) });
        let written = fs::read_to_string(&task.output_path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "10");
        assert!(lines[3].starts_with("3\t"));
    }

    #[test]
    fn test_outcome_descriptions() {
        let done = FileOutcome::Done {
            input_points: 3,
            output_points: 2,
            output: PathBuf::from("out/p_a.txt"),
        };
        assert_eq!(done.describe("a.txt"), "a.txt: 3 points in, 2 points out, saved to out/p_a.txt");
        assert_eq!(done.level(), LogLevel::Success);

        let failed = FileOutcome::Failed {
            stage: PipelineStage::Reading,
            error: "Missing required column: h_ph".to_string(),
        };
        assert_eq!(failed.log_event("b.csv").level, LogLevel::Error);
        assert!(failed.describe("b.csv").contains("while reading"));
    }
}
