use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::point::SourceFormat;
use crate::error::{LidarError, Result};

/// Downsampling strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Ratio,
    Count,
    Grid,
    KMeans,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Ratio => "ratio",
            Method::Count => "count",
            Method::Grid => "grid",
            Method::KMeans => "kmeans",
        }
    }

    /// Default parameter text offered for each method
    pub fn default_param(&self) -> &'static str {
        match self {
            Method::Ratio => "0.1",
            Method::Count => "1000",
            Method::Grid => "1.0",
            Method::KMeans => "1000",
        }
    }
}

impl FromStr for Method {
    type Err = LidarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ratio" => Ok(Method::Ratio),
            "count" => Ok(Method::Count),
            "grid" => Ok(Method::Grid),
            "kmeans" => Ok(Method::KMeans),
            _ => Err(LidarError::UnknownMethod { name: s.to_string() }),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A method together with its parsed, range-checked parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MethodParam {
    /// Fraction of points to keep, in `(0, 1]`; larger values are clamped on use
    Ratio(f64),
    /// Number of evenly spaced points to keep
    Count(usize),
    /// Grid cell edge, in coordinate units
    Grid(f64),
    /// Number of clusters
    KMeans(usize),
}

impl MethodParam {
    /// Parse the raw parameter text according to `method`
    pub fn parse(method: Method, raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = |reason: &str| LidarError::InvalidParameter {
            method: method.to_string(),
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        match method {
            Method::Ratio => {
                let ratio: f64 = raw.parse().map_err(|_| invalid("expected a number"))?;
                if ratio.is_nan() || ratio <= 0.0 {
                    return Err(invalid("ratio must be greater than 0"));
                }
                Ok(MethodParam::Ratio(ratio))
            }
            Method::Grid => {
                let size: f64 = raw.parse().map_err(|_| invalid("expected a number"))?;
                if !size.is_finite() || size <= 0.0 {
                    return Err(invalid("grid size must be a positive finite number"));
                }
                Ok(MethodParam::Grid(size))
            }
            Method::Count | Method::KMeans => {
                let k: usize = raw.parse().map_err(|_| invalid("expected a positive integer"))?;
                if k == 0 {
                    return Err(invalid("must be at least 1"));
                }
                Ok(if method == Method::Count {
                    MethodParam::Count(k)
                } else {
                    MethodParam::KMeans(k)
                })
            }
        }
    }

    pub fn method(&self) -> Method {
        match self {
            MethodParam::Ratio(_) => Method::Ratio,
            MethodParam::Count(_) => Method::Count,
            MethodParam::Grid(_) => Method::Grid,
            MethodParam::KMeans(_) => Method::KMeans,
        }
    }
}

impl fmt::Display for MethodParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodParam::Ratio(r) => write!(f, "ratio {}", r),
            MethodParam::Count(k) => write!(f, "count {}", k),
            MethodParam::Grid(g) => write!(f, "grid {}", g),
            MethodParam::KMeans(k) => write!(f, "kmeans k={}", k),
        }
    }
}

/// A user-submitted downsampling request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownsampleJob {
    pub method: Method,

    /// Raw parameter text, parsed per method by [`DownsampleJob::validate`]
    pub param: String,

    /// Directory scanned (non-recursively) for `.csv` and `.txt` files
    pub input_path: PathBuf,

    /// Directory receiving the reduced files, created if absent
    pub output_path: PathBuf,

    /// Prefix prepended to every output file name
    pub filename_prefix: String,
}

impl DownsampleJob {
    /// Check the job before any file is touched.
    ///
    /// Returns the parsed parameter; any error here is fatal to the whole batch.
    pub fn validate(&self) -> Result<MethodParam> {
        let param = MethodParam::parse(self.method, &self.param)?;
        if !self.input_path.is_dir() {
            return Err(LidarError::InputDirNotFound { path: self.input_path.clone() });
        }
        Ok(param)
    }

    /// Output path for an input file: `{prefix}_{stem}.{extension}` under `output_path`
    pub fn output_file_for(&self, input: &Path) -> PathBuf {
        let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed");
        let file_name = match input.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}_{}.{}", self.filename_prefix, stem, ext),
            None => format!("{}_{}", self.filename_prefix, stem),
        };
        self.output_path.join(file_name)
    }
}

/// One eligible input file scheduled for the per-file pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub path: PathBuf,
    pub output_path: PathBuf,
    pub format: SourceFormat,
}

impl FileTask {
    /// File name used in log lines
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(method: Method, param: &str) -> DownsampleJob {
        DownsampleJob {
            method,
            param: param.to_string(),
            input_path: std::env::temp_dir(),
            output_path: PathBuf::from("/out"),
            filename_prefix: "downsampled".to_string(),
        }
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("ratio".parse::<Method>().unwrap(), Method::Ratio);
        assert_eq!("kmeans".parse::<Method>().unwrap(), Method::KMeans);
        assert!(matches!(
            "Grid".parse::<Method>(),
            Err(LidarError::UnknownMethod { .. })
        ));
        assert!("voxel".parse::<Method>().is_err());
    }

    #[test]
    fn test_param_parsing_per_method() {
        assert_eq!(MethodParam::parse(Method::Ratio, "0.25").unwrap(), MethodParam::Ratio(0.25));
        assert_eq!(MethodParam::parse(Method::Grid, " 1.5 ").unwrap(), MethodParam::Grid(1.5));
        assert_eq!(MethodParam::parse(Method::Count, "100").unwrap(), MethodParam::Count(100));
        assert_eq!(MethodParam::parse(Method::KMeans, "7").unwrap(), MethodParam::KMeans(7));
    }

    #[test]
    fn test_param_rejects_bad_values() {
        assert!(MethodParam::parse(Method::Ratio, "abc").is_err());
        assert!(MethodParam::parse(Method::Ratio, "0").is_err());
        assert!(MethodParam::parse(Method::Ratio, "NaN").is_err());
        assert!(MethodParam::parse(Method::Grid, "-1").is_err());
        assert!(MethodParam::parse(Method::Grid, "inf").is_err());
        assert!(MethodParam::parse(Method::Count, "1.5").is_err());
        assert!(MethodParam::parse(Method::Count, "0").is_err());
        assert!(MethodParam::parse(Method::KMeans, "-3").is_err());
    }

    #[test]
    fn test_validate_missing_input_dir() {
        let mut bad = job(Method::Grid, "1.0");
        bad.input_path = PathBuf::from("/definitely/not/here");
        let err = bad.validate().unwrap_err();
        assert!(matches!(err, LidarError::InputDirNotFound { .. }));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_validate_checks_param_first() {
        let err = job(Method::Count, "many").validate().unwrap_err();
        assert!(matches!(err, LidarError::InvalidParameter { .. }));
    }

    #[test]
    fn test_output_file_naming() {
        let j = job(Method::Grid, "1.0");
        assert_eq!(
            j.output_file_for(Path::new("/in/a.txt")),
            PathBuf::from("/out/downsampled_a.txt")
        );
        assert_eq!(
            j.output_file_for(Path::new("/in/tile.07.csv")),
            PathBuf::from("/out/downsampled_tile.07.csv")
        );
    }
}
