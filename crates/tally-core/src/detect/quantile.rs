//! Linear-interpolated quantiles

/// Value at percentile `p` (0.0..=1.0) of an ascending-sorted slice
///
/// Uses rank `(n - 1) * p`, interpolating between the neighbouring elements
/// when the rank is fractional. Callers guarantee `sorted` is non-empty; the
/// anomaly detector only calls this above its minimum sample size.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let index = (sorted.len() - 1) as f64 * p;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        return sorted[lower];
    }

    let weight = index - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}
