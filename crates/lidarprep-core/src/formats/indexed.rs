//! Indexed text point files: a count line, then `idx lat lon height` rows

use std::io::{BufRead, Write};

use crate::cancel::StopSignal;
use crate::error::{LidarError, Result};
use crate::formats::{
    format_coordinate, MalformedPolicy, PointReader, PointWriter, WriteOutcome, PROGRESS_INTERVAL,
};
use crate::models::{PointCollection, PointRecord, SourceFormat};

/// Reader for the fixed-layout indexed text format.
///
/// The leading count is informational and never checked against the rows
/// that follow. Columns after the fourth are ignored.
#[derive(Debug, Clone, Copy)]
pub struct IndexedTextReader {
    policy: MalformedPolicy,
}

impl IndexedTextReader {
    /// Bad rows fail the read unless configured otherwise
    pub const DEFAULT_POLICY: MalformedPolicy = MalformedPolicy::Abort;

    pub fn new(policy: MalformedPolicy) -> Self {
        Self { policy }
    }
}

impl Default for IndexedTextReader {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POLICY)
    }
}

impl PointReader for IndexedTextReader {
    fn parse(&self, input: &mut dyn BufRead) -> Result<PointCollection> {
        let mut lines = input.lines();

        let Some(first) = lines.next() else {
            return Ok(PointCollection::empty(SourceFormat::IndexedText));
        };
        let first = first?;
        let declared: u64 = first.trim().parse().map_err(|_| LidarError::MalformedRecord {
            line: 1,
            reason: format!("expected a point count, found '{}'", first.trim()),
        })?;

        let mut points = Vec::new();
        for (i, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line, i as u64 + 2) {
                Ok(Some(point)) => points.push(point),
                Ok(None) => continue,
                Err(e) => match self.policy {
                    MalformedPolicy::Skip => continue,
                    MalformedPolicy::Abort => return Err(e),
                },
            }
        }

        if declared != points.len() as u64 {
            tracing::debug!(
                declared = declared,
                parsed = points.len(),
                "point count line does not match parsed rows"
            );
        }

        Ok(PointCollection::new(points, SourceFormat::IndexedText))
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::IndexedText
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn format_name(&self) -> &str {
        "Indexed text"
    }
}

/// Lines with fewer than four fields carry no point and yield `None`
fn parse_line(line: &str, line_no: u64) -> Result<Option<PointRecord>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        tracing::trace!(line = line_no, fields = parts.len(), "skipping short line");
        return Ok(None);
    }

    let coordinate = |raw: &str| -> Result<f64> {
        raw.parse::<f64>().map_err(|_| LidarError::MalformedRecord {
            line: line_no,
            reason: format!("'{}' is not a number", raw),
        })
    };

    Ok(Some(PointRecord::new(coordinate(parts[1])?, coordinate(parts[2])?, coordinate(parts[3])?)))
}

/// Writer producing the indexed text format with 1-based, tab-separated rows
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedTextWriter;

impl PointWriter for IndexedTextWriter {
    fn write_to(
        &self,
        output: &mut dyn Write,
        points: &[PointRecord],
        stop: &StopSignal,
    ) -> Result<WriteOutcome> {
        writeln!(output, "{}", points.len())?;

        for (i, point) in points.iter().enumerate() {
            if stop.is_stopped() {
                output.flush()?;
                tracing::debug!(written = i, "indexed text write stopped");
                return Ok(WriteOutcome::Aborted { written: i });
            }

            writeln!(
                output,
                "{}\t{}\t{}\t{}",
                i + 1,
                format_coordinate(point.latitude),
                format_coordinate(point.longitude),
                format_coordinate(point.height)
            )?;

            if (i + 1) % PROGRESS_INTERVAL == 0 {
                tracing::debug!("written {} points", i + 1);
            }
        }

        Ok(WriteOutcome::Completed { written: points.len() })
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::IndexedText
    }
}
