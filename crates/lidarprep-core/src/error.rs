//! Error types for lidarprep

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LidarError {
    // Job configuration errors
    #[error("Unsupported downsampling method: {name}. Use ratio, count, grid, or kmeans")]
    UnknownMethod { name: String },

    #[error("Invalid parameter '{value}' for method {method}: {reason}")]
    InvalidParameter {
        method: String,
        value: String,
        reason: String,
    },

    #[error("Input directory not found: {path}")]
    InputDirNotFound { path: PathBuf },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Read errors
    #[error("Unsupported format: {extension}. Supported formats: {}", supported.join(", "))]
    UnsupportedFormat {
        extension: String,
        supported: Vec<String>,
    },

    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("No .csv files found in {path}")]
    NoCsvFiles { path: PathBuf },

    // Sampling errors
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Sampling failed: {0}")]
    Sampling(String),

    // IO errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LidarError {
    /// Whether this error is a batch-level configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LidarError::UnknownMethod { .. }
                | LidarError::InvalidParameter { .. }
                | LidarError::InputDirNotFound { .. }
                | LidarError::ConfigInvalid { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LidarError>;
