//! Point-cloud downsampling strategies
//!
//! Every strategy is a pure function over an in-memory point slice. None of
//! them touch the filesystem; all of them poll the [`StopSignal`] inside their
//! loops and return [`LidarError::Cancelled`](crate::LidarError::Cancelled)
//! once it is raised.

pub mod count;
pub mod grid;
pub mod kmeans;
pub mod ratio;

use crate::cancel::StopSignal;
use crate::error::Result;
use crate::models::{MethodParam, PointCollection};

pub use count::downsample_by_count;
pub use grid::downsample_by_grid;
pub use kmeans::{downsample_by_kmeans, KMeansParams};
pub use ratio::downsample_by_ratio;

/// Tunables that are not part of the user-facing method parameter
#[derive(Debug, Clone, Default)]
pub struct SamplingOptions {
    /// Seed for ratio sampling; `None` draws a fresh seed per call
    pub ratio_seed: Option<u64>,

    pub kmeans: KMeansParams,
}

/// Apply the strategy selected by `param` and return the reduced collection
pub fn downsample(
    collection: &PointCollection,
    param: &MethodParam,
    options: &SamplingOptions,
    stop: &StopSignal,
) -> Result<PointCollection> {
    let points = &collection.points;
    let reduced = match *param {
        MethodParam::Ratio(ratio) => {
            let seed = options.ratio_seed.unwrap_or_else(|| {
                let seed = rand::random();
                tracing::debug!(seed, "drew ratio sampling seed");
                seed
            });
            downsample_by_ratio(points, ratio, seed, stop)?
        }
        MethodParam::Count(count) => downsample_by_count(points, count, stop)?,
        MethodParam::Grid(size) => downsample_by_grid(points, size, stop)?,
        MethodParam::KMeans(k) => downsample_by_kmeans(points, k, &options.kmeans, stop)?,
    };

    Ok(collection.derive(reduced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LidarError;
    use crate::models::{PointRecord, SourceFormat};

    fn collection(n: usize) -> PointCollection {
        let points =
            (0..n).map(|i| PointRecord::new(i as f64, (i * 2) as f64, 1.0)).collect();
        PointCollection::new(points, SourceFormat::IndexedText)
    }

    #[test]
    fn test_dispatch_keeps_format_tag() {
        let input = collection(20);
        let options = SamplingOptions { ratio_seed: Some(7), ..Default::default() };
        let stop = StopSignal::new();

        for param in [
            MethodParam::Ratio(0.5),
            MethodParam::Count(5),
            MethodParam::Grid(4.0),
            MethodParam::KMeans(3),
        ] {
            let out = downsample(&input, &param, &options, &stop).unwrap();
            assert_eq!(out.source_format, SourceFormat::IndexedText);
            assert!(out.len() <= input.len(), "{param} grew the collection");
        }
    }

    #[test]
    fn test_fixed_seed_ratio_is_reproducible() {
        let input = collection(100);
        let options = SamplingOptions { ratio_seed: Some(42), ..Default::default() };
        let stop = StopSignal::new();
        let a = downsample(&input, &MethodParam::Ratio(0.3), &options, &stop).unwrap();
        let b = downsample(&input, &MethodParam::Ratio(0.3), &options, &stop).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 30);
    }

    #[test]
    fn test_stopped_signal_cancels_every_strategy() {
        let input = collection(10);
        let stop = StopSignal::new();
        stop.stop();
        let options = SamplingOptions::default();

        for param in [
            MethodParam::Ratio(0.5),
            MethodParam::Count(5),
            MethodParam::Grid(1.0),
            MethodParam::KMeans(3),
        ] {
            let err = downsample(&input, &param, &options, &stop).unwrap_err();
            assert!(matches!(err, LidarError::Cancelled), "{param} ignored the stop signal");
        }
    }
}
