// Post-collection analysis: hourly buckets, per-family peaks and run-wide statistics.
// Everything here is pure and works on read-only slices of the run's samples.

pub mod hourly;
pub mod peaks;
pub mod stats;

pub use hourly::{aggregate_hourly, hour_key};
pub use peaks::find_peaks;
pub use stats::{overall_stats, percentile_nearest_rank};

pub(crate) fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}

pub(crate) fn max_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
