use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use crate::cancel::StopSignal;
use crate::error::Result;
use crate::models::PointRecord;

/// Uniform random sample without replacement of `floor(N * ratio)` points.
///
/// Ratios above 1 keep every point (in shuffled order). Points come back in
/// sampled order, not file order.
pub fn downsample_by_ratio(
    points: &[PointRecord],
    ratio: f64,
    seed: u64,
    stop: &StopSignal,
) -> Result<Vec<PointRecord>> {
    let n = points.len();
    let target = ((n as f64) * ratio.min(1.0)).floor().max(0.0) as usize;
    let target = target.min(n);

    let mut rng = StdRng::seed_from_u64(seed);
    let selected = index::sample(&mut rng, n, target);

    let mut sampled = Vec::with_capacity(target);
    for idx in selected.iter() {
        stop.check()?;
        sampled.push(points[idx]);
    }
    Ok(sampled)
}
