//! lidarprep core - point-cloud readers, writers and downsampling
//!
//! This crate contains the point models, the CSV and indexed-text formats,
//! the downsampling strategies and the batch machinery that runs them over
//! whole directories.

pub mod batch;
pub mod cancel;
pub mod config;
pub mod convert;
pub mod error;
pub mod formats;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod sampling;

pub use batch::{BatchCoordinator, BatchEvent, BatchHandle, BatchSummary, FileReport};
pub use cancel::StopSignal;
pub use config::{CliConfigOverrides, ConfigSource, LayeredConfig};
pub use error::{LidarError, Result};
pub use formats::{FormatRegistry, MalformedPolicy};
pub use logging::{LogEvent, LogLevel, LogSink};
pub use models::{DownsampleJob, Method, MethodParam, PointCollection, PointRecord, SourceFormat};
pub use pipeline::{process_file, FileOutcome, PipelineStage};
