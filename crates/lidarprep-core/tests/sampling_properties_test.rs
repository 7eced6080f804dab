//! Property tests for the downsampling strategies

use lidarprep_core::sampling::{
    downsample_by_count, downsample_by_grid, downsample_by_kmeans, downsample_by_ratio,
    grid::cell_key, KMeansParams,
};
use lidarprep_core::{PointRecord, StopSignal};
use proptest::prelude::*;
use std::collections::HashSet;

fn point_strategy() -> impl Strategy<Value = PointRecord> {
    (-90.0f64..90.0, -180.0f64..180.0, -500.0f64..9000.0)
        .prop_map(|(lat, lon, h)| PointRecord::new(lat, lon, h))
}

fn cloud(max: usize) -> impl Strategy<Value = Vec<PointRecord>> {
    prop::collection::vec(point_strategy(), 0..max)
}

proptest! {
    #[test]
    fn ratio_keeps_floor_of_fraction(points in cloud(200), ratio in 0.001f64..1.0, seed in any::<u64>()) {
        let sampled = downsample_by_ratio(&points, ratio, seed, &StopSignal::new()).unwrap();
        let expected = ((points.len() as f64) * ratio).floor() as usize;
        prop_assert_eq!(sampled.len(), expected);
        prop_assert!(sampled.iter().all(|p| points.contains(p)));
    }

    #[test]
    fn ratio_is_reproducible_with_seed(points in cloud(100), seed in any::<u64>()) {
        let stop = StopSignal::new();
        let a = downsample_by_ratio(&points, 0.5, seed, &stop).unwrap();
        let b = downsample_by_ratio(&points, 0.5, seed, &stop).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn count_keeps_min_of_target_and_size(points in cloud(200), count in 1usize..300) {
        let selected = downsample_by_count(&points, count, &StopSignal::new()).unwrap();
        prop_assert_eq!(selected.len(), count.min(points.len()));
        if let (Some(first), Some(last)) = (selected.first(), selected.last()) {
            prop_assert_eq!(first, &points[0]);
            prop_assert_eq!(last, &points[points.len() - 1]);
        }
    }

    #[test]
    fn grid_keeps_one_point_per_occupied_cell(points in cloud(200), size in 0.5f64..50.0) {
        let stop = StopSignal::new();
        let kept = downsample_by_grid(&points, size, &stop).unwrap();

        let cells: HashSet<(u64, u64)> = points.iter().map(|p| cell_key(p, size)).collect();
        prop_assert_eq!(kept.len(), cells.len());

        let kept_cells: HashSet<(u64, u64)> = kept.iter().map(|p| cell_key(p, size)).collect();
        prop_assert_eq!(kept_cells.len(), kept.len());

        let again = downsample_by_grid(&points, size, &stop).unwrap();
        prop_assert_eq!(kept, again);
    }

    #[test]
    fn kmeans_returns_original_points(points in cloud(60), k in 1usize..12) {
        let params = KMeansParams { max_iterations: 50, ..KMeansParams::default() };
        let selected = downsample_by_kmeans(&points, k, &params, &StopSignal::new()).unwrap();

        prop_assert_eq!(selected.len(), k.min(points.len()));
        prop_assert!(selected.iter().all(|p| points.contains(p)));
    }
}
