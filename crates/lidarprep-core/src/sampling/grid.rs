use std::collections::HashSet;

use crate::cancel::StopSignal;
use crate::error::Result;
use crate::models::PointRecord;

/// Grid cell containing a point, as the bit patterns of `(floor(lat / size), floor(lon / size))`.
///
/// Keys stay on `f64` so tiny cell sizes never saturate an integer cast.
pub fn cell_key(point: &PointRecord, size: f64) -> (u64, u64) {
    (cell_index(point.latitude, size), cell_index(point.longitude, size))
}

fn cell_index(coordinate: f64, size: f64) -> u64 {
    // adding 0.0 folds -0.0 into 0.0
    ((coordinate / size).floor() + 0.0).to_bits()
}

/// Keep the first point, in file order, of every occupied grid cell
pub fn downsample_by_grid(
    points: &[PointRecord],
    size: f64,
    stop: &StopSignal,
) -> Result<Vec<PointRecord>> {
    let mut occupied = HashSet::new();
    let mut kept = Vec::new();

    for point in points {
        stop.check()?;
        if occupied.insert(cell_key(point, size)) {
            kept.push(*point);
        }
    }

    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_point_per_cell_wins() {
        let points = vec![
            PointRecord::new(10.0, 20.0, 5.0),
            PointRecord::new(10.1, 20.1, 5.1),
            PointRecord::new(50.0, 60.0, 9.0),
        ];
        let kept = downsample_by_grid(&points, 1.0, &StopSignal::new()).unwrap();
        assert_eq!(kept, vec![points[0], points[2]]);
    }

    #[test]
    fn test_negative_coordinates_use_floor() {
        // -0.5 and 0.5 straddle zero and must land in different cells
        let points = vec![PointRecord::new(-0.5, 0.0, 0.0), PointRecord::new(0.5, 0.0, 0.0)];
        assert_eq!(cell_key(&points[0], 1.0), ((-1.0f64).to_bits(), 0.0f64.to_bits()));
        let kept = downsample_by_grid(&points, 1.0, &StopSignal::new()).unwrap();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_huge_cell_collapses_to_one_point() {
        let points: Vec<PointRecord> =
            (0..50).map(|i| PointRecord::new(i as f64, 100.0 + i as f64, 0.0)).collect();
        let kept = downsample_by_grid(&points, 1.0e6, &StopSignal::new()).unwrap();
        assert_eq!(kept, vec![points[0]]);
    }

    #[test]
    fn test_negative_zero_shares_cell_with_zero() {
        let points = vec![PointRecord::new(-0.0, 1.0, 0.0), PointRecord::new(0.0, 1.0, 0.0)];
        assert_eq!(cell_key(&points[0], 2.0), cell_key(&points[1], 2.0));
        let kept = downsample_by_grid(&points, 2.0, &StopSignal::new()).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_extremely_small_cell_keeps_distinct_points() {
        // coordinate / size is far beyond the i64 range here
        let points = vec![
            PointRecord::new(10.0, 20.0, 5.0),
            PointRecord::new(10.1, 20.1, 5.1),
            PointRecord::new(50.0, 60.0, 9.0),
        ];
        let kept = downsample_by_grid(&points, 1.0e-18, &StopSignal::new()).unwrap();
        assert_eq!(kept, points);
    }

    #[test]
    fn test_tiny_cell_is_identity() {
        let points: Vec<PointRecord> =
            (0..50).map(|i| PointRecord::new(i as f64 * 0.01, 0.0, 0.0)).collect();
        let kept = downsample_by_grid(&points, 1.0e-6, &StopSignal::new()).unwrap();
        assert_eq!(kept, points);
    }
}
