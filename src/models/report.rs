// Final result document: the contract with downstream report rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{HourlyBucket, PeakSummary, Sample, SizingRecommendation};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub version: String,
    pub server: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u64,
    pub interval_seconds: u64,
    /// Planned sample count for the configured duration and interval.
    pub total_samples: u64,
    /// Samples actually collected (planned minus failed ticks).
    pub samples_collected: u64,
    pub error_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    pub avg: f64,
    pub max: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub cpu_cores: MetricStats,
    #[serde(rename = "memoryMB")]
    pub memory_mb: MetricStats,
    #[serde(rename = "avgReadIOPS")]
    pub avg_read_iops: f64,
    #[serde(rename = "avgWriteIOPS")]
    pub avg_write_iops: f64,
    /// Highest hourly total IOPS (0 when no bucket was measurable).
    #[serde(rename = "peakTotalIOPS")]
    pub peak_total_iops: f64,
    #[serde(rename = "peakThroughputMBps")]
    pub peak_throughput_mbps: f64,
    #[serde(rename = "maxDataSizeMB")]
    pub max_data_size_mb: f64,
    pub avg_batch_requests_per_sec: f64,
    pub max_user_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDocument {
    pub metadata: RunMetadata,
    pub overall: OverallStats,
    pub hourly: Vec<HourlyBucket>,
    pub peaks: PeakSummary,
    pub recommendation: SizingRecommendation,
    pub samples: Vec<Sample>,
}
