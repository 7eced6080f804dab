//! `lat_ph,lon_ph,h_ph` CSV point files

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::io::{BufRead, Write};

use crate::cancel::StopSignal;
use crate::error::{LidarError, Result};
use crate::formats::{
    format_coordinate, MalformedPolicy, PointReader, PointWriter, WriteOutcome, PROGRESS_INTERVAL,
};
use crate::models::{PointCollection, PointRecord, SourceFormat};

pub const LAT_COLUMN: &str = "lat_ph";
pub const LON_COLUMN: &str = "lon_ph";
pub const HEIGHT_COLUMN: &str = "h_ph";

/// Find the position of a required header column
pub(crate) fn column_index(headers: &StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| LidarError::MissingColumn { column: column.to_string() })
}

/// Reader for CSV exports with named latitude, longitude and height columns
#[derive(Debug, Clone, Copy)]
pub struct CsvPointReader {
    policy: MalformedPolicy,
}

impl CsvPointReader {
    /// Bad rows are dropped unless configured otherwise
    pub const DEFAULT_POLICY: MalformedPolicy = MalformedPolicy::Skip;

    pub fn new(policy: MalformedPolicy) -> Self {
        Self { policy }
    }
}

impl Default for CsvPointReader {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POLICY)
    }
}

impl PointReader for CsvPointReader {
    fn parse(&self, input: &mut dyn BufRead) -> Result<PointCollection> {
        let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(input);

        let headers = reader.headers()?.clone();
        let lat_idx = column_index(&headers, LAT_COLUMN)?;
        let lon_idx = column_index(&headers, LON_COLUMN)?;
        let h_idx = column_index(&headers, HEIGHT_COLUMN)?;

        let mut points = Vec::new();
        for (row, record) in reader.records().enumerate() {
            // header is line 1
            let fallback_line = row as u64 + 2;
            let parsed = record
                .map_err(|e| LidarError::MalformedRecord {
                    line: e.position().map(|p| p.line()).unwrap_or(fallback_line),
                    reason: e.to_string(),
                })
                .and_then(|record| {
                    let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);
                    parse_row(&record, [lat_idx, lon_idx, h_idx], line)
                });

            match parsed {
                Ok(point) => points.push(point),
                Err(e) => match self.policy {
                    MalformedPolicy::Skip => continue,
                    MalformedPolicy::Abort => return Err(e),
                },
            }
        }

        Ok(PointCollection::new(points, SourceFormat::Csv))
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Csv
    }

    fn supported_extensions(&self) -> &[&str] {
        &["csv"]
    }

    fn format_name(&self) -> &str {
        "CSV"
    }
}

fn parse_row(record: &StringRecord, [lat, lon, h]: [usize; 3], line: u64) -> Result<PointRecord> {
    let field = |idx: usize, name: &str| -> Result<f64> {
        let raw = record.get(idx).ok_or_else(|| LidarError::MalformedRecord {
            line,
            reason: format!("row is missing column {}", name),
        })?;
        raw.trim().parse::<f64>().map_err(|_| LidarError::MalformedRecord {
            line,
            reason: format!("{} value '{}' is not a number", name, raw),
        })
    };

    Ok(PointRecord::new(
        field(lat, LAT_COLUMN)?,
        field(lon, LON_COLUMN)?,
        field(h, HEIGHT_COLUMN)?,
    ))
}

/// Writer producing `lat_ph,lon_ph,h_ph` CSV
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvPointWriter;

impl PointWriter for CsvPointWriter {
    fn write_to(
        &self,
        output: &mut dyn Write,
        points: &[PointRecord],
        stop: &StopSignal,
    ) -> Result<WriteOutcome> {
        let mut writer = WriterBuilder::new().terminator(Terminator::Any(b'\n')).from_writer(output);
        writer.write_record([LAT_COLUMN, LON_COLUMN, HEIGHT_COLUMN])?;

        for (i, point) in points.iter().enumerate() {
            if stop.is_stopped() {
                writer.flush()?;
                tracing::debug!(written = i, "CSV write stopped");
                return Ok(WriteOutcome::Aborted { written: i });
            }

            writer.write_record([
                format_coordinate(point.latitude),
                format_coordinate(point.longitude),
                format_coordinate(point.height),
            ])?;

            if (i + 1) % PROGRESS_INTERVAL == 0 {
                tracing::debug!("written {} points", i + 1);
            }
        }

        writer.flush()?;
        Ok(WriteOutcome::Completed { written: points.len() })
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Csv
    }
}
