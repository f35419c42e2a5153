// Hourly bucketing. I/O rates come from cumulative-counter deltas between the first and
// last sample of each bucket, not from averaging per-sample rates.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, NaiveTime, Timelike};

use super::{max_f64, mean_f64};
use crate::models::{HourlyBucket, Sample};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Timestamp truncated to the start of its hour.
pub fn hour_key(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_time(NaiveTime::from_hms_opt(ts.hour(), 0, 0).unwrap_or_default())
}

/// One bucket per distinct hour, ascending. Every sample lands in exactly one bucket.
pub fn aggregate_hourly(samples: &[Sample]) -> Vec<HourlyBucket> {
    let mut by_hour: BTreeMap<NaiveDateTime, Vec<&Sample>> = BTreeMap::new();
    for s in samples {
        by_hour.entry(hour_key(s.timestamp)).or_default().push(s);
    }
    by_hour
        .into_iter()
        .map(|(hour, refs)| aggregate_bucket(hour, &refs))
        .collect()
}

fn aggregate_bucket(hour: NaiveDateTime, refs: &[&Sample]) -> HourlyBucket {
    let cpu: Vec<f64> = refs.iter().filter_map(|s| s.used_cpu_cores).collect();
    let memory: Vec<f64> = refs.iter().map(|s| s.committed_memory_mb).collect();
    let batch: Vec<f64> = refs.iter().map(|s| s.batch_requests_per_sec).collect();
    let connections: Vec<f64> = refs.iter().map(|s| s.user_connections as f64).collect();

    let rates = io_rates(refs);
    if rates.is_none() && refs.len() > 1 {
        tracing::warn!(
            hour = %hour,
            samples = refs.len(),
            "I/O counters went backwards within the hour (counter reset); IOPS unmeasured"
        );
    }

    HourlyBucket {
        hour,
        sample_count: refs.len(),
        avg_cpu_cores: mean_f64(&cpu),
        max_cpu_cores: max_f64(&cpu),
        avg_memory_mb: mean_f64(&memory),
        max_memory_mb: max_f64(&memory),
        avg_batch_req_per_sec: mean_f64(&batch),
        max_batch_req_per_sec: max_f64(&batch),
        avg_connections: mean_f64(&connections),
        max_connections: refs.iter().map(|s| s.user_connections).max().unwrap_or(0),
        read_iops: rates.map(|r| r.read_iops),
        write_iops: rates.map(|r| r.write_iops),
        total_iops: rates.map(|r| r.read_iops + r.write_iops),
        throughput_mbps: rates.map(|r| r.throughput_mbps),
    }
}

#[derive(Debug, Clone, Copy)]
struct IoRates {
    read_iops: f64,
    write_iops: f64,
    throughput_mbps: f64,
}

/// Rates across the bucket. `None` when fewer than two samples, no elapsed time, or any
/// cumulative counter decreases between consecutive samples.
fn io_rates(refs: &[&Sample]) -> Option<IoRates> {
    let (first, last) = (refs.first()?, refs.last()?);
    let elapsed = (last.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0;
    if elapsed <= 0.0 {
        return None;
    }
    if !counters_monotonic(refs) {
        return None;
    }
    let reads = last.total_reads - first.total_reads;
    let writes = last.total_writes - first.total_writes;
    let bytes = (last.total_bytes_read - first.total_bytes_read)
        + (last.total_bytes_written - first.total_bytes_written);
    Some(IoRates {
        read_iops: reads as f64 / elapsed,
        write_iops: writes as f64 / elapsed,
        throughput_mbps: bytes as f64 / BYTES_PER_MB / elapsed,
    })
}

fn counters_monotonic(refs: &[&Sample]) -> bool {
    refs.windows(2).all(|w| {
        let (a, b) = (w[0], w[1]);
        b.total_reads >= a.total_reads
            && b.total_writes >= a.total_writes
            && b.total_bytes_read >= a.total_bytes_read
            && b.total_bytes_written >= a.total_bytes_written
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn hour_key_truncates_minutes_and_seconds() {
        let ts = NaiveDate::from_ymd_opt(2025, 11, 26)
            .unwrap()
            .and_hms_milli_opt(14, 37, 12, 500)
            .unwrap();
        let key = hour_key(ts);
        assert_eq!(key.to_string(), "2025-11-26 14:00:00");
    }
}
