use crate::cancel::StopSignal;
use crate::error::Result;
use crate::models::PointRecord;

/// Indices of `count` positions linearly spaced over `[0, len - 1]`, rounded to
/// the nearest integer. Repeated indices are kept as-is.
pub fn linspace_indices(len: usize, count: usize) -> Vec<usize> {
    let count = count.min(len);
    match count {
        0 => Vec::new(),
        1 => vec![0],
        _ => {
            let step = (len - 1) as f64 / (count - 1) as f64;
            (0..count).map(|i| ((i as f64 * step).round() as usize).min(len - 1)).collect()
        }
    }
}

/// Keep `min(count, N)` evenly spaced points in original order. Deterministic.
pub fn downsample_by_count(
    points: &[PointRecord],
    count: usize,
    stop: &StopSignal,
) -> Result<Vec<PointRecord>> {
    let indices = linspace_indices(points.len(), count);
    let mut selected = Vec::with_capacity(indices.len());
    for idx in indices {
        stop.check()?;
        selected.push(points[idx]);
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        assert_eq!(linspace_indices(10, 4), vec![0, 3, 6, 9]);
        assert_eq!(linspace_indices(5, 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(linspace_indices(7, 1), vec![0]);
        assert_eq!(linspace_indices(0, 3), Vec::<usize>::new());
    }

    #[test]
    fn test_linspace_rounds_to_nearest() {
        // step 9/5 = 1.8 -> 0, 1.8, 3.6, 5.4, 7.2, 9.0
        assert_eq!(linspace_indices(10, 6), vec![0, 2, 4, 5, 7, 9]);
    }

    #[test]
    fn test_near_full_count_keeps_requested_size() {
        // spacing never drops below one, so the indices stay distinct
        let indices = linspace_indices(10, 9);
        assert_eq!(indices.len(), 9);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_count_above_len_returns_everything_in_order() {
        let points: Vec<PointRecord> =
            (0..4).map(|i| PointRecord::new(i as f64, 1.0, 2.0)).collect();
        let selected = downsample_by_count(&points, 100, &StopSignal::new()).unwrap();
        assert_eq!(selected, points);
    }
}
