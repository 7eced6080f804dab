use crate::error::{LidarError, Result};
use crate::formats::{CsvPointReader, FormatRegistry, IndexedTextReader, MalformedPolicy};
use crate::sampling::{KMeansParams, SamplingOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "lidarprep.toml";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has at least the same precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() >= self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for lidarprep
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Maximum number of files processed at the same time
    pub workers: ConfigValue<usize>,
    pub kmeans_seed: ConfigValue<u64>,
    pub kmeans_max_iterations: ConfigValue<usize>,
    /// Fixed seed for ratio sampling; `None` draws one per file
    pub ratio_seed: ConfigValue<Option<u64>>,
    pub csv_malformed: ConfigValue<MalformedPolicy>,
    pub indexed_malformed: ConfigValue<MalformedPolicy>,
    /// Directory for run-history log files; `None` disables the history file
    pub log_dir: ConfigValue<Option<PathBuf>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            workers: ConfigValue::new(default_workers(), ConfigSource::Default),
            kmeans_seed: ConfigValue::new(KMeansParams::default().seed, ConfigSource::Default),
            kmeans_max_iterations: ConfigValue::new(
                KMeansParams::default().max_iterations,
                ConfigSource::Default,
            ),
            ratio_seed: ConfigValue::new(None, ConfigSource::Default),
            csv_malformed: ConfigValue::new(CsvPointReader::DEFAULT_POLICY, ConfigSource::Default),
            indexed_malformed: ConfigValue::new(
                IndexedTextReader::DEFAULT_POLICY,
                ConfigSource::Default,
            ),
            log_dir: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| LidarError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| LidarError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(workers) = file_config.workers {
            self.workers.update(validate_workers(workers)?, ConfigSource::File);
        }

        if let Some(seed) = file_config.kmeans_seed {
            self.kmeans_seed.update(seed, ConfigSource::File);
        }

        if let Some(iterations) = file_config.kmeans_max_iterations {
            self.kmeans_max_iterations.update(iterations, ConfigSource::File);
        }

        if let Some(seed) = file_config.ratio_seed {
            self.ratio_seed.update(Some(seed), ConfigSource::File);
        }

        if let Some(policy) = file_config.csv_malformed {
            self.csv_malformed.update(policy, ConfigSource::File);
        }

        if let Some(policy) = file_config.indexed_malformed {
            self.indexed_malformed.update(policy, ConfigSource::File);
        }

        if let Some(dir) = file_config.log_dir {
            self.log_dir.update(Some(dir), ConfigSource::File);
        }

        Ok(self)
    }

    /// Load the file only when it exists
    pub fn load_from_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        if path.as_ref().is_file() {
            self.load_from_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // LIDARPREP_WORKERS
        if let Ok(raw) = env::var("LIDARPREP_WORKERS") {
            match raw.parse::<usize>().ok().filter(|w| *w > 0) {
                Some(workers) => self.workers.update(workers, ConfigSource::Environment),
                None => tracing::warn!(
                    "Invalid LIDARPREP_WORKERS value '{}': expected a positive integer",
                    raw
                ),
            }
        }

        // LIDARPREP_KMEANS_SEED
        if let Ok(raw) = env::var("LIDARPREP_KMEANS_SEED") {
            match raw.parse::<u64>() {
                Ok(seed) => self.kmeans_seed.update(seed, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid LIDARPREP_KMEANS_SEED value '{}': expected an unsigned integer",
                    raw
                ),
            }
        }

        // LIDARPREP_KMEANS_MAX_ITERATIONS
        if let Ok(raw) = env::var("LIDARPREP_KMEANS_MAX_ITERATIONS") {
            match raw.parse::<usize>() {
                Ok(iterations) => {
                    self.kmeans_max_iterations.update(iterations, ConfigSource::Environment)
                }
                Err(_) => tracing::warn!(
                    "Invalid LIDARPREP_KMEANS_MAX_ITERATIONS value '{}': expected an unsigned integer",
                    raw
                ),
            }
        }

        // LIDARPREP_RATIO_SEED
        if let Ok(raw) = env::var("LIDARPREP_RATIO_SEED") {
            match raw.parse::<u64>() {
                Ok(seed) => self.ratio_seed.update(Some(seed), ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid LIDARPREP_RATIO_SEED value '{}': expected an unsigned integer",
                    raw
                ),
            }
        }

        // LIDARPREP_CSV_MALFORMED
        if let Ok(raw) = env::var("LIDARPREP_CSV_MALFORMED") {
            match raw.parse::<MalformedPolicy>() {
                Ok(policy) => self.csv_malformed.update(policy, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid LIDARPREP_CSV_MALFORMED value '{}': expected skip or abort",
                    raw
                ),
            }
        }

        // LIDARPREP_INDEXED_MALFORMED
        if let Ok(raw) = env::var("LIDARPREP_INDEXED_MALFORMED") {
            match raw.parse::<MalformedPolicy>() {
                Ok(policy) => self.indexed_malformed.update(policy, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid LIDARPREP_INDEXED_MALFORMED value '{}': expected skip or abort",
                    raw
                ),
            }
        }

        // LIDARPREP_LOG_DIR
        if let Ok(dir) = env::var("LIDARPREP_LOG_DIR") {
            if !dir.is_empty() {
                self.log_dir.update(Some(PathBuf::from(dir)), ConfigSource::Environment);
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(workers) = overrides.workers.filter(|w| *w > 0) {
            self.workers.update(workers, ConfigSource::Cli);
        }

        if let Some(seed) = overrides.seed {
            self.ratio_seed.update(Some(seed), ConfigSource::Cli);
            self.kmeans_seed.update(seed, ConfigSource::Cli);
        }

        // a single CLI policy applies to both layouts
        if let Some(policy) = overrides.on_malformed {
            self.csv_malformed.update(policy, ConfigSource::Cli);
            self.indexed_malformed.update(policy, ConfigSource::Cli);
        }

        if let Some(dir) = overrides.log_dir {
            self.log_dir.update(Some(dir), ConfigSource::Cli);
        }
    }

    /// Sampling tunables derived from this configuration
    pub fn sampling_options(&self) -> SamplingOptions {
        SamplingOptions {
            ratio_seed: self.ratio_seed.value,
            kmeans: KMeansParams {
                seed: self.kmeans_seed.value,
                max_iterations: self.kmeans_max_iterations.value,
                ..KMeansParams::default()
            },
        }
    }

    /// Reader/writer registry honoring the configured malformed-record policies
    pub fn format_registry(&self) -> FormatRegistry {
        FormatRegistry::with_policies(self.csv_malformed.value, self.indexed_malformed.value)
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert("workers".to_string(), (self.workers.value.to_string(), self.workers.source));

        map.insert(
            "kmeans_seed".to_string(),
            (self.kmeans_seed.value.to_string(), self.kmeans_seed.source),
        );

        map.insert(
            "kmeans_max_iterations".to_string(),
            (self.kmeans_max_iterations.value.to_string(), self.kmeans_max_iterations.source),
        );

        map.insert(
            "ratio_seed".to_string(),
            (
                self.ratio_seed.value.map(|s| s.to_string()).unwrap_or_else(|| "random".to_string()),
                self.ratio_seed.source,
            ),
        );

        map.insert(
            "csv_malformed".to_string(),
            (self.csv_malformed.value.to_string(), self.csv_malformed.source),
        );

        map.insert(
            "indexed_malformed".to_string(),
            (self.indexed_malformed.value.to_string(), self.indexed_malformed.source),
        );

        map.insert(
            "log_dir".to_string(),
            (
                self.log_dir
                    .value
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "disabled".to_string()),
                self.log_dir.source,
            ),
        );

        map
    }
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    workers: Option<usize>,
    kmeans_seed: Option<u64>,
    kmeans_max_iterations: Option<usize>,
    ratio_seed: Option<u64>,
    csv_malformed: Option<MalformedPolicy>,
    indexed_malformed: Option<MalformedPolicy>,
    log_dir: Option<PathBuf>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub workers: Option<usize>,
    /// Seeds both ratio sampling and k-means initialization
    pub seed: Option<u64>,
    pub on_malformed: Option<MalformedPolicy>,
    pub log_dir: Option<PathBuf>,
}

/// Logical core count, falling back to a single worker
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn validate_workers(workers: usize) -> Result<usize> {
    if workers == 0 {
        return Err(LidarError::ConfigInvalid {
            key: "workers".to_string(),
            reason: "workers must be at least 1".to_string(),
        });
    }
    Ok(workers)
}
