// Checkpoint file for one run: full-state JSON snapshot, replaced on every save.
// Writes go to `<path>.tmp` and are renamed over the checkpoint so a crash mid-write
// never leaves a truncated file behind.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::models::{CheckpointRecord, Sample, progress_percent};
use crate::sampler::RunPlan;
use crate::version;

/// Grace period past the expected next save before `status` reports a checkpoint as stale.
pub const STALE_GRACE_SECS: i64 = 300;

pub struct CheckpointStore {
    path: PathBuf,
    server: String,
    interval_seconds: u64,
    duration_minutes: u64,
    checkpoint_interval_minutes: u64,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>, plan: &RunPlan) -> Self {
        Self {
            path: path.into(),
            server: plan.server.clone(),
            interval_seconds: plan.interval_seconds,
            duration_minutes: plan.duration_minutes,
            checkpoint_interval_minutes: plan.checkpoint_interval_minutes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the checkpoint with the current state of the run.
    #[instrument(
        skip(self, samples, start_time),
        fields(operation = "save_checkpoint", samples_count = samples.len())
    )]
    pub async fn save(
        &self,
        samples: &[Sample],
        start_time: DateTime<Utc>,
        total_samples: u64,
        error_count: u64,
    ) -> anyhow::Result<()> {
        let collected = samples.len() as u64;
        let record = CheckpointRecord {
            version: version::VERSION.to_string(),
            server_instance: self.server.clone(),
            start_time,
            current_time: Utc::now(),
            samples_collected: collected,
            total_samples,
            progress_percent: progress_percent(collected, total_samples),
            error_count,
            interval_seconds: self.interval_seconds,
            duration_minutes: self.duration_minutes,
            checkpoint_interval_minutes: self.checkpoint_interval_minutes,
            samples: samples.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&record)?;
        write_atomic(&self.path, &json).await?;
        tracing::debug!(path = %self.path.display(), "Checkpoint saved");
        Ok(())
    }

    /// Load a checkpoint. Missing or unparsable files yield `None` so the caller starts fresh.
    pub async fn load(path: &Path) -> Option<CheckpointRecord> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    operation = "load_checkpoint",
                    "Checkpoint not readable; starting fresh"
                );
                return None;
            }
        };
        match serde_json::from_slice::<CheckpointRecord>(&bytes) {
            Ok(record) => {
                tracing::info!(
                    path = %path.display(),
                    samples_collected = record.samples_collected,
                    total_samples = record.total_samples,
                    "Loaded checkpoint"
                );
                Some(record)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    operation = "load_checkpoint",
                    "Checkpoint unparsable; starting fresh"
                );
                None
            }
        }
    }

    /// Delete the checkpoint after a successful run. Returns whether a file was removed.
    pub async fn remove(&self) -> anyhow::Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Checkpoint file removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `bytes` to `path` via a temp file + rename. Creates the parent directory.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakAt {
    pub value: f64,
    pub at: NaiveDateTime,
}

/// Read-only view of a checkpoint for checking on a run in progress.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointStatus {
    pub version: String,
    pub server: String,
    pub start_time: DateTime<Utc>,
    pub last_checkpoint: DateTime<Utc>,
    pub elapsed_secs: i64,
    pub since_checkpoint_secs: i64,
    pub samples_collected: u64,
    pub total_samples: u64,
    pub progress_percent: f64,
    pub error_count: u64,
    pub success_rate_percent: f64,
    pub avg_cpu_cores: Option<f64>,
    #[serde(rename = "avgBufferPoolMB")]
    pub avg_buffer_pool_mb: f64,
    pub avg_batch_requests_per_sec: f64,
    pub avg_user_connections: f64,
    pub peak_cpu_cores: Option<PeakAt>,
    #[serde(rename = "peakCommittedMemoryMB")]
    pub peak_committed_memory_mb: Option<PeakAt>,
    pub peak_user_connections: Option<PeakAt>,
    pub recent: Vec<Sample>,
    pub stale_after_secs: i64,
    pub stale: bool,
}

impl CheckpointStatus {
    pub fn from_record(record: &CheckpointRecord, now: DateTime<Utc>) -> Self {
        let samples = &record.samples;
        let collected = samples.len() as u64;
        let attempts = collected + record.error_count;
        let success_rate_percent = if attempts > 0 {
            collected as f64 / attempts as f64 * 100.0
        } else {
            0.0
        };
        let since_checkpoint_secs = (now - record.current_time).num_seconds();

        let n = samples.len().max(1) as f64;
        let cpu: Vec<f64> = samples.iter().filter_map(|s| s.used_cpu_cores).collect();
        let avg_cpu_cores = if cpu.is_empty() {
            None
        } else {
            Some(cpu.iter().sum::<f64>() / cpu.len() as f64)
        };

        Self {
            version: record.version.clone(),
            server: record.server_instance.clone(),
            start_time: record.start_time,
            last_checkpoint: record.current_time,
            elapsed_secs: (record.current_time - record.start_time).num_seconds(),
            since_checkpoint_secs,
            samples_collected: collected,
            total_samples: record.total_samples,
            progress_percent: progress_percent(collected, record.total_samples),
            error_count: record.error_count,
            success_rate_percent,
            avg_cpu_cores,
            avg_buffer_pool_mb: samples.iter().map(|s| s.buffer_pool_mb).sum::<f64>() / n,
            avg_batch_requests_per_sec: samples
                .iter()
                .map(|s| s.batch_requests_per_sec)
                .sum::<f64>()
                / n,
            avg_user_connections: samples
                .iter()
                .map(|s| s.user_connections as f64)
                .sum::<f64>()
                / n,
            peak_cpu_cores: peak_at(samples, |s| s.used_cpu_cores),
            peak_committed_memory_mb: peak_at(samples, |s| Some(s.committed_memory_mb)),
            peak_user_connections: peak_at(samples, |s| Some(s.user_connections as f64)),
            recent: samples[samples.len().saturating_sub(5)..].to_vec(),
            stale_after_secs: stale_after_secs(record),
            stale: since_checkpoint_secs > stale_after_secs(record),
        }
    }
}

/// Expected gap between saves plus a grace period.
fn stale_after_secs(record: &CheckpointRecord) -> i64 {
    record.checkpoint_interval_minutes as i64 * 60 + STALE_GRACE_SECS
}

/// First sample holding the maximum of `f`.
fn peak_at(samples: &[Sample], f: impl Fn(&Sample) -> Option<f64>) -> Option<PeakAt> {
    let mut best: Option<PeakAt> = None;
    for s in samples {
        let Some(v) = f(s) else { continue };
        if best.as_ref().is_none_or(|b| v > b.value) {
            best = Some(PeakAt {
                value: v,
                at: s.timestamp,
            });
        }
    }
    best
}

/// Compact duration, e.g. `1d 2h 5m` or `42s`.
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Server:            {}", self.server)?;
        writeln!(f, "Written by:        {}", self.version)?;
        writeln!(f, "Start time:        {}", self.start_time.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(
            f,
            "Last checkpoint:   {}",
            self.last_checkpoint.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(f, "Elapsed:           {}", format_duration(self.elapsed_secs))?;
        writeln!(
            f,
            "Since checkpoint:  {}",
            format_duration(self.since_checkpoint_secs)
        )?;
        writeln!(
            f,
            "Samples:           {}/{} ({:.1}%)",
            self.samples_collected, self.total_samples, self.progress_percent
        )?;
        writeln!(
            f,
            "Errors:            {} (success rate {:.1}%)",
            self.error_count, self.success_rate_percent
        )?;
        if let Some(cpu) = self.avg_cpu_cores {
            writeln!(f, "Avg CPU cores:     {:.2}", cpu)?;
        }
        writeln!(f, "Avg buffer pool:   {:.0} MB", self.avg_buffer_pool_mb)?;
        writeln!(f, "Avg batch req/s:   {:.1}", self.avg_batch_requests_per_sec)?;
        writeln!(f, "Avg connections:   {:.0}", self.avg_user_connections)?;
        for (label, peak) in [
            ("Peak CPU cores:    ", &self.peak_cpu_cores),
            ("Peak memory MB:    ", &self.peak_committed_memory_mb),
            ("Peak connections:  ", &self.peak_user_connections),
        ] {
            if let Some(p) = peak {
                writeln!(f, "{}{:.1} at {}", label, p.value, p.at.format("%Y-%m-%d %H:%M:%S"))?;
            }
        }
        for s in &self.recent {
            writeln!(
                f,
                "  [{}] cpu {} | mem {:.0} MB | conn {}",
                s.timestamp.format("%H:%M:%S"),
                s.used_cpu_cores
                    .map(|c| format!("{:.2} cores", c))
                    .unwrap_or_else(|| "n/a".into()),
                s.committed_memory_mb,
                s.user_connections
            )?;
        }
        if self.stale {
            writeln!(
                f,
                "[WARNING] checkpoint is older than {}; the run may have stopped",
                format_duration(self.stale_after_secs)
            )?;
        } else {
            writeln!(f, "[OK] run appears to be progressing")?;
        }
        Ok(())
    }
}
