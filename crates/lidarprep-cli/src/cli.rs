use clap::{Parser, Subcommand};
use lidarprep_core::{MalformedPolicy, Method};
use std::path::PathBuf;

/// lidarprep - point-cloud downsampling and LiDAR export conversion
#[derive(Parser, Debug)]
#[command(name = "lidarprep")]
#[command(about = "Point-cloud downsampling and LiDAR export conversion", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./lidarprep.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Downsample every .csv and .txt point file in a directory
    Downsample(DownsampleArgs),

    /// Merge raw LiDAR CSV exports into indexed text files, one per sub-directory
    Convert(ConvertArgs),

    /// Show the effective configuration and where each value comes from
    Config,
}

#[derive(Parser, Debug)]
pub struct DownsampleArgs {
    /// Downsampling method (ratio, count, grid or kmeans)
    #[arg(long, short = 'm')]
    pub method: Method,

    /// Method parameter: fraction for ratio, target size for count and kmeans,
    /// cell size for grid. Defaults to 0.1 (ratio), 1000 (count), 1.0 (grid)
    /// or 1000 (kmeans) when omitted
    #[arg(long, short = 'p')]
    pub param: Option<String>,

    /// Directory containing the input point files
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Directory receiving the reduced files
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Prefix for output file names
    #[arg(long, default_value = "downsampled")]
    pub prefix: String,

    /// Maximum number of files processed at the same time
    #[arg(long)]
    pub workers: Option<usize>,

    /// Seed for ratio sampling and k-means initialization
    #[arg(long)]
    pub seed: Option<u64>,

    /// What to do with records that cannot be parsed (skip or abort)
    #[arg(long, value_name = "POLICY")]
    pub on_malformed: Option<MalformedPolicy>,

    /// Directory for the run-history log file
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Directory whose sub-directories hold raw CSV exports
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Directory receiving one .txt file per sub-directory
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Maximum number of sub-directories converted at the same time
    #[arg(long)]
    pub workers: Option<usize>,

    /// Directory for the run-history log file
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}
