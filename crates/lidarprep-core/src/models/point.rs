use serde::{Deserialize, Serialize};
use std::fmt;

/// A single LiDAR measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

impl PointRecord {
    pub fn new(latitude: f64, longitude: f64, height: f64) -> Self {
        Self { latitude, longitude, height }
    }

    /// Horizontal position as `[lat, lon]`, the feature space used for clustering
    pub fn planar(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// Textual point file layouts understood by the readers and writers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// `lat_ph,lon_ph,h_ph` CSV with a header row
    Csv,
    /// Count line followed by `idx lat lon height` rows
    IndexedText,
}

impl SourceFormat {
    /// File extension (without dot) used for this format
    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::IndexedText => "txt",
        }
    }

    /// Resolve a format from a file extension, case-sensitive like the input filter
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "csv" => Some(SourceFormat::Csv),
            "txt" => Some(SourceFormat::IndexedText),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Csv => write!(f, "CSV"),
            SourceFormat::IndexedText => write!(f, "indexed text"),
        }
    }
}

/// Ordered points read from one file, tagged with the layout they came from
#[derive(Debug, Clone, PartialEq)]
pub struct PointCollection {
    pub points: Vec<PointRecord>,
    pub source_format: SourceFormat,
}

impl PointCollection {
    pub fn new(points: Vec<PointRecord>, source_format: SourceFormat) -> Self {
        Self { points, source_format }
    }

    pub fn empty(source_format: SourceFormat) -> Self {
        Self::new(Vec::new(), source_format)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Build a derived collection that keeps this collection's format tag
    pub fn derive(&self, points: Vec<PointRecord>) -> Self {
        Self::new(points, self.source_format)
    }
}
