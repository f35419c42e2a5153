// Hourly buckets and per-family peaks.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Aggregates for all samples sharing one hour. I/O rates are `None` when unmeasured
/// (single-sample bucket, zero elapsed time, or a counter reset inside the bucket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBucket {
    pub hour: NaiveDateTime,
    pub sample_count: usize,
    #[serde(rename = "avgCPUCores")]
    pub avg_cpu_cores: f64,
    #[serde(rename = "maxCPUCores")]
    pub max_cpu_cores: f64,
    #[serde(rename = "avgMemoryMB")]
    pub avg_memory_mb: f64,
    #[serde(rename = "maxMemoryMB")]
    pub max_memory_mb: f64,
    pub avg_batch_req_per_sec: f64,
    pub max_batch_req_per_sec: f64,
    pub avg_connections: f64,
    pub max_connections: u32,
    #[serde(rename = "readIOPS")]
    pub read_iops: Option<f64>,
    #[serde(rename = "writeIOPS")]
    pub write_iops: Option<f64>,
    #[serde(rename = "totalIOPS")]
    pub total_iops: Option<f64>,
    #[serde(rename = "throughputMBps")]
    pub throughput_mbps: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakValue {
    pub hour: NaiveDateTime,
    pub value: f64,
}

/// Peak hour per metric family. Families are independent and may name different hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakSummary {
    pub cpu: Option<PeakValue>,
    pub memory: Option<PeakValue>,
    pub activity: Option<PeakValue>,
    pub iops: Option<PeakValue>,
}
