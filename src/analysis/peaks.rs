// Peak hour per metric family. Ties resolve to the earliest hour (buckets are ascending).

use crate::models::{HourlyBucket, PeakSummary, PeakValue};

pub fn find_peaks(buckets: &[HourlyBucket]) -> PeakSummary {
    PeakSummary {
        cpu: peak_by(buckets, |b| Some(b.max_cpu_cores)),
        memory: peak_by(buckets, |b| Some(b.max_memory_mb)),
        activity: peak_by(buckets, |b| Some(b.max_batch_req_per_sec)),
        iops: peak_by(buckets, |b| b.total_iops),
    }
}

/// Bucket with the largest value; buckets where `f` is `None` are skipped.
fn peak_by(
    buckets: &[HourlyBucket],
    f: impl Fn(&HourlyBucket) -> Option<f64>,
) -> Option<PeakValue> {
    let mut best: Option<PeakValue> = None;
    for b in buckets {
        let Some(value) = f(b) else { continue };
        if best.is_none_or(|p| value > p.value) {
            best = Some(PeakValue {
                hour: b.hour,
                value,
            });
        }
    }
    best
}
