// Raw counter row (query result) and the derived per-tick Sample.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::SampleError;

/// One row from the sampling query. Column names follow the SQL result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawCounterRow {
    /// Server clock at sample time; the sampler falls back to local time when absent.
    #[serde(default)]
    pub sample_time: Option<NaiveDateTime>,
    #[serde(rename = "TotalCPUs")]
    pub total_cpus: u32,
    /// Cumulative CPU time consumed by the database engine since startup.
    #[serde(rename = "SQLServerCPUTimeMs")]
    pub cpu_time_ms: u64,
    #[serde(rename = "TotalMemoryMB", default)]
    pub total_memory_mb: f64,
    #[serde(rename = "CommittedMemoryMB")]
    pub committed_memory_mb: f64,
    #[serde(rename = "TargetMemoryMB", default)]
    pub target_memory_mb: f64,
    #[serde(rename = "BufferPoolMB")]
    pub buffer_pool_mb: f64,
    pub batch_requests_per_sec: f64,
    pub compilations_per_sec: f64,
    pub user_connections: u32,
    pub total_reads: u64,
    pub total_writes: u64,
    pub total_read_latency_ms: u64,
    pub total_write_latency_ms: u64,
    #[serde(default)]
    pub total_bytes_read: u64,
    #[serde(default)]
    pub total_bytes_written: u64,
    #[serde(rename = "DataSizeMB", default)]
    pub data_size_mb: Option<f64>,
    #[serde(default)]
    pub top_wait_type: Option<String>,
    #[serde(default)]
    pub top_wait_time_ms: u64,
}

/// How `used_cpu_cores` is derived from the cumulative CPU-time counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuAccounting {
    /// Delta against the previous sample over the elapsed time between them.
    #[default]
    Delta,
    /// Whole counter divided by one interval (legacy result files).
    Cumulative,
}

/// One collected sample. Same shape in checkpoints and the final result document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    #[serde(rename = "totalCPUs")]
    pub total_cpus: u32,
    /// `None` when there is no baseline (first sample) or the CPU counter went backwards.
    #[serde(rename = "usedCPUCores")]
    pub used_cpu_cores: Option<f64>,
    pub cpu_time_ms: u64,
    #[serde(rename = "committedMemoryMB")]
    pub committed_memory_mb: f64,
    #[serde(rename = "bufferPoolMB")]
    pub buffer_pool_mb: f64,
    pub batch_requests_per_sec: f64,
    pub compilations_per_sec: f64,
    pub user_connections: u32,
    pub total_reads: u64,
    pub total_writes: u64,
    pub read_stall_ms: u64,
    pub write_stall_ms: u64,
    #[serde(default)]
    pub total_bytes_read: u64,
    #[serde(default)]
    pub total_bytes_written: u64,
    #[serde(rename = "dataSizeMB", default)]
    pub data_size_mb: f64,
    #[serde(default)]
    pub top_wait_type: String,
    #[serde(default)]
    pub top_wait_time_ms: u64,
}

impl Sample {
    /// Validate a raw row and derive CPU usage.
    /// `previous` is the last accepted sample of the run (checkpointed ones included).
    pub fn from_row(
        row: RawCounterRow,
        timestamp: NaiveDateTime,
        previous: Option<&Sample>,
        interval_seconds: u64,
        accounting: CpuAccounting,
    ) -> Result<Self, SampleError> {
        if row.total_cpus == 0 {
            return Err(SampleError::InvalidRow("TotalCPUs must be > 0".into()));
        }
        for (name, v) in [
            ("CommittedMemoryMB", row.committed_memory_mb),
            ("BufferPoolMB", row.buffer_pool_mb),
            ("BatchRequestsPerSec", row.batch_requests_per_sec),
            ("CompilationsPerSec", row.compilations_per_sec),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(SampleError::InvalidRow(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, v
                )));
            }
        }

        let cpu_percent = match accounting {
            CpuAccounting::Delta => previous.and_then(|prev| {
                let delta_ms = row.cpu_time_ms.checked_sub(prev.cpu_time_ms)?;
                let gap = (timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
                let elapsed = if gap > 0.0 {
                    gap
                } else {
                    interval_seconds as f64
                };
                Some(cpu_percent(delta_ms, elapsed, row.total_cpus))
            }),
            CpuAccounting::Cumulative => Some(cpu_percent(
                row.cpu_time_ms,
                interval_seconds as f64,
                row.total_cpus,
            )),
        };
        let total_cpus = row.total_cpus as f64;
        let used_cpu_cores = cpu_percent.map(|p| (p / 100.0 * total_cpus).min(total_cpus));

        Ok(Self {
            timestamp,
            total_cpus: row.total_cpus,
            used_cpu_cores,
            cpu_time_ms: row.cpu_time_ms,
            committed_memory_mb: row.committed_memory_mb,
            buffer_pool_mb: row.buffer_pool_mb,
            batch_requests_per_sec: row.batch_requests_per_sec,
            compilations_per_sec: row.compilations_per_sec,
            user_connections: row.user_connections,
            total_reads: row.total_reads,
            total_writes: row.total_writes,
            read_stall_ms: row.total_read_latency_ms,
            write_stall_ms: row.total_write_latency_ms,
            total_bytes_read: row.total_bytes_read,
            total_bytes_written: row.total_bytes_written,
            data_size_mb: row.data_size_mb.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0),
            top_wait_type: row.top_wait_type.unwrap_or_default(),
            top_wait_time_ms: row.top_wait_time_ms,
        })
    }
}

/// CPU milliseconds over `elapsed_secs` on `cpus` cores, as a percentage in [0, 100].
pub fn cpu_percent(cpu_ms: u64, elapsed_secs: f64, cpus: u32) -> f64 {
    let capacity = elapsed_secs * cpus as f64 * 10.0;
    if capacity <= 0.0 {
        return 0.0;
    }
    (cpu_ms as f64 / capacity).clamp(0.0, 100.0)
}
