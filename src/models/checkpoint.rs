// Checkpoint record: full-state snapshot of an in-progress run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Sample;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRecord {
    /// Crate version that wrote the file.
    pub version: String,
    pub server_instance: String,
    pub start_time: DateTime<Utc>,
    pub current_time: DateTime<Utc>,
    pub samples_collected: u64,
    pub total_samples: u64,
    pub progress_percent: f64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub interval_seconds: u64,
    #[serde(default)]
    pub duration_minutes: u64,
    #[serde(default)]
    pub checkpoint_interval_minutes: u64,
    pub samples: Vec<Sample>,
}

impl CheckpointRecord {
    /// Index the sampling loop continues from when resuming.
    pub fn resume_index(&self) -> u64 {
        self.samples_collected
    }
}

/// Progress as a percentage of the planned sample count.
pub fn progress_percent(collected: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (collected as f64 / total as f64 * 100.0).min(100.0)
}
