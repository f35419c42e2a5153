// Run-wide statistics (avg / max / P95) over all collected samples.

use super::{max_f64, mean_f64};
use crate::models::{HourlyBucket, MetricStats, OverallStats, Sample};

pub fn overall_stats(samples: &[Sample], buckets: &[HourlyBucket]) -> OverallStats {
    let cpu: Vec<f64> = samples.iter().filter_map(|s| s.used_cpu_cores).collect();
    let memory: Vec<f64> = samples.iter().map(|s| s.committed_memory_mb).collect();
    let batch: Vec<f64> = samples.iter().map(|s| s.batch_requests_per_sec).collect();

    OverallStats {
        cpu_cores: metric_stats(&cpu),
        memory_mb: metric_stats(&memory),
        avg_read_iops: average_rate(samples, |s| s.total_reads),
        avg_write_iops: average_rate(samples, |s| s.total_writes),
        peak_total_iops: buckets
            .iter()
            .filter_map(|b| b.total_iops)
            .fold(0.0, f64::max),
        peak_throughput_mbps: buckets
            .iter()
            .filter_map(|b| b.throughput_mbps)
            .fold(0.0, f64::max),
        max_data_size_mb: samples.iter().map(|s| s.data_size_mb).fold(0.0, f64::max),
        avg_batch_requests_per_sec: mean_f64(&batch),
        max_user_connections: samples.iter().map(|s| s.user_connections).max().unwrap_or(0),
    }
}

fn metric_stats(v: &[f64]) -> MetricStats {
    MetricStats {
        avg: mean_f64(v),
        max: max_f64(v),
        p95: percentile_nearest_rank(v, 95.0),
    }
}

/// Nearest-rank percentile: the value at rank ceil(p/100 * n) of the sorted set. 0 when empty.
pub fn percentile_nearest_rank(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let rank = (p * n as f64 / 100.0).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}

/// Average per-second rate of a cumulative counter. Intervals where the counter
/// went backwards (restart) or no time passed are left out of both sums.
fn average_rate(samples: &[Sample], counter: impl Fn(&Sample) -> u64) -> f64 {
    let mut delta_total = 0u64;
    let mut secs_total = 0.0;
    for w in samples.windows(2) {
        let (a, b) = (&w[0], &w[1]);
        let secs = (b.timestamp - a.timestamp).num_milliseconds() as f64 / 1000.0;
        let Some(delta) = counter(b).checked_sub(counter(a)) else {
            continue;
        };
        if secs <= 0.0 {
            continue;
        }
        delta_total += delta;
        secs_total += secs;
    }
    if secs_total <= 0.0 {
        return 0.0;
    }
    delta_total as f64 / secs_total
}
