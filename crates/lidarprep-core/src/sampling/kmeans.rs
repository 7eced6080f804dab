//! K-means clustering on horizontal position
//!
//! Clusters `(lat, lon)` into k groups, then replaces each cluster centre by
//! the original point closest to it, so the result only ever contains real
//! measurements.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::cancel::StopSignal;
use crate::error::{LidarError, Result};
use crate::models::PointRecord;

type IndexedPosition = GeomWithData<[f64; 2], usize>;

/// Parameters for K-means clustering
#[derive(Debug, Clone)]
pub struct KMeansParams {
    /// Seed for centroid initialization
    pub seed: u64,
    /// Maximum Lloyd iterations (default: 300)
    pub max_iterations: usize,
    /// Convergence threshold, relative to the mean coordinate variance (default: 1e-4)
    pub tolerance: f64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

/// Reduce to `k` original points, one per cluster.
///
/// When `N <= k` the input is returned unchanged. Height does not take part
/// in clustering.
pub fn downsample_by_kmeans(
    points: &[PointRecord],
    k: usize,
    params: &KMeansParams,
    stop: &StopSignal,
) -> Result<Vec<PointRecord>> {
    if points.len() <= k {
        return Ok(points.to_vec());
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let coords: Vec<[f64; 2]> = points.iter().map(PointRecord::planar).collect();
    let centers = fit_centers(&coords, k, params, stop)?;

    let tree = RTree::bulk_load(
        coords.iter().enumerate().map(|(i, c)| IndexedPosition::new(*c, i)).collect(),
    );

    let mut selected = Vec::with_capacity(k);
    for center in &centers {
        stop.check()?;
        let idx = nearest_first_occurrence(&tree, center).ok_or_else(|| {
            LidarError::Sampling("no point found for cluster centre".to_string())
        })?;
        selected.push(points[idx]);
    }
    Ok(selected)
}

/// Run k-means++ seeding followed by Lloyd iterations; returns the final centres
pub fn fit_centers(
    coords: &[[f64; 2]],
    k: usize,
    params: &KMeansParams,
    stop: &StopSignal,
) -> Result<Vec<[f64; 2]>> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut centers = init_plus_plus(coords, k, &mut rng, stop)?;
    let threshold = params.tolerance * mean_variance(coords);

    for iteration in 0..params.max_iterations {
        stop.check()?;

        let center_tree = RTree::bulk_load(
            centers.iter().enumerate().map(|(i, c)| IndexedPosition::new(*c, i)).collect(),
        );

        let mut sums = vec![[0.0_f64; 2]; k];
        let mut counts = vec![0usize; k];
        for coord in coords {
            let nearest = center_tree.nearest_neighbor(coord).ok_or_else(|| {
                LidarError::Sampling("cluster centre index is empty".to_string())
            })?;
            let label = nearest.data;
            sums[label][0] += coord[0];
            sums[label][1] += coord[1];
            counts[label] += 1;
        }

        let mut shift = 0.0;
        for c in 0..k {
            // empty clusters keep their previous centre
            if counts[c] == 0 {
                continue;
            }
            let updated = [sums[c][0] / counts[c] as f64, sums[c][1] / counts[c] as f64];
            shift += squared_distance(&updated, &centers[c]);
            centers[c] = updated;
        }

        if shift <= threshold {
            tracing::debug!(iterations = iteration + 1, "k-means converged");
            break;
        }
    }

    Ok(centers)
}

/// k-means++ seeding: each new centre is drawn with probability proportional
/// to its squared distance from the closest centre chosen so far
fn init_plus_plus(
    coords: &[[f64; 2]],
    k: usize,
    rng: &mut StdRng,
    stop: &StopSignal,
) -> Result<Vec<[f64; 2]>> {
    let n = coords.len();
    let mut centers = Vec::with_capacity(k);
    centers.push(coords[rng.gen_range(0..n)]);

    let mut closest: Vec<f64> = coords.iter().map(|c| squared_distance(c, &centers[0])).collect();

    while centers.len() < k {
        stop.check()?;

        let total: f64 = closest.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, d) in closest.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // every point already coincides with a centre
            rng.gen_range(0..n)
        };

        let center = coords[next];
        for (d, c) in closest.iter_mut().zip(coords) {
            *d = d.min(squared_distance(c, &center));
        }
        centers.push(center);
    }

    Ok(centers)
}

/// Index of the closest point to `query`; among equally close points the
/// lowest index (first occurrence in the file) wins
fn nearest_first_occurrence(tree: &RTree<IndexedPosition>, query: &[f64; 2]) -> Option<usize> {
    let mut candidates = tree.nearest_neighbor_iter_with_distance_2(query);
    let (first, best) = candidates.next()?;
    let mut idx = first.data;
    for (candidate, distance) in candidates {
        if distance > best {
            break;
        }
        idx = idx.min(candidate.data);
    }
    Some(idx)
}

fn squared_distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

fn mean_variance(coords: &[[f64; 2]]) -> f64 {
    let n = coords.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mut variance = 0.0;
    for axis in 0..2 {
        let mean = coords.iter().map(|c| c[axis]).sum::<f64>() / n;
        variance += coords.iter().map(|c| (c[axis] - mean).powi(2)).sum::<f64>() / n;
    }
    variance / 2.0
}
