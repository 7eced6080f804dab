//! Point file readers and writers
//!
//! Each layout implements [`PointReader`] and [`PointWriter`]. The
//! [`FormatRegistry`] owns one instance of each and resolves them by file
//! extension (for reading) or by [`SourceFormat`] (for writing back in the
//! input's own layout).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::cancel::StopSignal;
use crate::error::{LidarError, Result};
use crate::models::{PointCollection, PointRecord, SourceFormat};

pub mod csv;
pub mod indexed;

pub use self::csv::{CsvPointReader, CsvPointWriter};
pub use self::indexed::{IndexedTextReader, IndexedTextWriter};

/// Records written between two progress traces
pub const PROGRESS_INTERVAL: usize = 1000;

/// What a reader does with a record it cannot parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Drop the record silently and keep reading
    Skip,
    /// Fail the whole read
    Abort,
}

impl FromStr for MalformedPolicy {
    type Err = LidarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(MalformedPolicy::Skip),
            "abort" => Ok(MalformedPolicy::Abort),
            _ => Err(LidarError::ConfigInvalid {
                key: "on_malformed".to_string(),
                reason: format!("Invalid malformed-record policy: {}. Use skip or abort", s),
            }),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPolicy::Skip => f.write_str("skip"),
            MalformedPolicy::Abort => f.write_str("abort"),
        }
    }
}

/// Result of a write that completed or stopped on request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Completed { written: usize },
    /// Stopped before finishing; the partial file stays on disk
    Aborted { written: usize },
}

impl WriteOutcome {
    pub fn written(&self) -> usize {
        match self {
            WriteOutcome::Completed { written } | WriteOutcome::Aborted { written } => *written,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, WriteOutcome::Aborted { .. })
    }
}

/// Parses one point file layout
pub trait PointReader: Send + Sync {
    /// Parse points from an open stream
    fn parse(&self, input: &mut dyn BufRead) -> Result<PointCollection>;

    /// Read all points from a file
    fn read(&self, path: &Path) -> Result<PointCollection> {
        let file = File::open(path)?;
        let mut input = BufReader::new(file);
        self.parse(&mut input)
    }

    /// Layout produced by this reader
    fn format(&self) -> SourceFormat;

    /// Get supported file extensions (e.g., ["csv"])
    fn supported_extensions(&self) -> &[&str];

    /// Get human-readable format name
    fn format_name(&self) -> &str;
}

/// Serializes points in one layout, polling a stop signal before every record
pub trait PointWriter: Send + Sync {
    fn write_to(
        &self,
        output: &mut dyn Write,
        points: &[PointRecord],
        stop: &StopSignal,
    ) -> Result<WriteOutcome>;

    /// Create (or truncate) `path` and write all points to it
    fn write(&self, path: &Path, points: &[PointRecord], stop: &StopSignal) -> Result<WriteOutcome> {
        let file = File::create(path)?;
        let mut output = BufWriter::new(file);
        let outcome = self.write_to(&mut output, points, stop)?;
        output.flush()?;
        Ok(outcome)
    }

    fn format(&self) -> SourceFormat;
}

/// Render a coordinate the way the source data writes it: shortest
/// round-trip form, with a fractional part even for integral values.
pub fn format_coordinate(value: f64) -> String {
    format!("{:?}", value)
}

/// Central registry for point readers and writers
pub struct FormatRegistry {
    readers: Vec<Box<dyn PointReader>>,
    writers: Vec<Box<dyn PointWriter>>,
}

impl FormatRegistry {
    /// Create a new empty format registry
    pub fn new() -> Self {
        Self { readers: Vec::new(), writers: Vec::new() }
    }

    /// Registry with both built-in layouts and explicit malformed-record policies
    pub fn with_policies(csv: MalformedPolicy, indexed: MalformedPolicy) -> Self {
        let mut registry = Self::new();
        registry.register_reader(Box::new(CsvPointReader::new(csv)));
        registry.register_reader(Box::new(IndexedTextReader::new(indexed)));
        registry.register_writer(Box::new(CsvPointWriter));
        registry.register_writer(Box::new(IndexedTextWriter));
        registry
    }

    pub fn register_reader(&mut self, reader: Box<dyn PointReader>) {
        self.readers.push(reader);
    }

    pub fn register_writer(&mut self, writer: Box<dyn PointWriter>) {
        self.writers.push(writer);
    }

    /// Detect format and return the reader for this file extension
    pub fn detect_format(&self, path: &Path) -> Result<&dyn PointReader> {
        let extension = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            LidarError::UnsupportedFormat {
                extension: "none".to_string(),
                supported: self.supported_formats(),
            }
        })?;

        self.readers
            .iter()
            .find(|r| r.supported_extensions().contains(&extension))
            .map(|r| r.as_ref())
            .ok_or_else(|| LidarError::UnsupportedFormat {
                extension: extension.to_string(),
                supported: self.supported_formats(),
            })
    }

    /// Writer producing the given layout
    pub fn writer_for(&self, format: SourceFormat) -> Option<&dyn PointWriter> {
        self.writers.iter().find(|w| w.format() == format).map(|w| w.as_ref())
    }

    /// Get list of all supported input extensions
    pub fn supported_formats(&self) -> Vec<String> {
        self.readers
            .iter()
            .flat_map(|r| r.supported_extensions())
            .map(|s| s.to_string())
            .collect()
    }

    /// Whether a path has an extension some reader accepts
    pub fn is_supported(&self, path: &Path) -> bool {
        self.detect_format(path).is_ok()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_policies(CsvPointReader::DEFAULT_POLICY, IndexedTextReader::DEFAULT_POLICY)
    }
}
