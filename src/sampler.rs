// Sampling loop for one monitoring run.
// One fetch per interval; failed ticks are counted, never fatal. Checkpoints are written on a
// wall-clock schedule and once more when a shutdown signal arrives between ticks.

use std::path::PathBuf;

use chrono::{DateTime, Local, TimeDelta, Utc};
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::instrument;

use crate::checkpoint_store::{CheckpointStore, format_duration};
use crate::config::{self, RunConfig};
use crate::error::{RunError, SampleError};
use crate::models::{CpuAccounting, Sample, progress_percent};
use crate::source::SampleSource;

/// Timing and identity of one run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub server: String,
    pub duration_minutes: u64,
    pub interval_seconds: u64,
    pub checkpoint_interval_minutes: u64,
    pub query_timeout_secs: u64,
    pub cpu_accounting: CpuAccounting,
    pub resume_from: Option<PathBuf>,
}

impl From<&RunConfig> for RunPlan {
    fn from(c: &RunConfig) -> Self {
        Self {
            server: c.server.clone(),
            duration_minutes: c.duration_minutes,
            interval_seconds: c.interval_seconds,
            checkpoint_interval_minutes: c.checkpoint_interval_minutes,
            query_timeout_secs: c.query_timeout_secs,
            cpu_accounting: c.cpu_accounting,
            resume_from: c.resume_from.as_ref().map(PathBuf::from),
        }
    }
}

impl RunPlan {
    pub fn total_samples(&self) -> u64 {
        config::total_samples(self.duration_minutes, self.interval_seconds)
    }

    pub fn validate(&self) -> Result<(), RunError> {
        let invalid = |msg: String| Err(RunError::InvalidConfiguration(msg));
        if self.duration_minutes == 0 {
            return invalid("duration_minutes must be > 0".into());
        }
        if self.interval_seconds == 0 {
            return invalid("interval_seconds must be > 0".into());
        }
        if !config::duration_minutes_fit(self.duration_minutes) {
            return invalid(format!(
                "duration_minutes is too large, got {}",
                self.duration_minutes
            ));
        }
        if self.total_samples() == 0 {
            return invalid(format!(
                "duration of {} min is shorter than one {} s interval",
                self.duration_minutes, self.interval_seconds
            ));
        }
        if self.checkpoint_interval_minutes == 0 {
            return invalid("checkpoint_interval_minutes must be > 0".into());
        }
        if self.query_timeout_secs == 0 {
            return invalid("query_timeout_secs must be > 0".into());
        }
        Ok(())
    }
}

/// Test queries slower than this are worth a warning before a long run.
const SLOW_QUERY: Duration = Duration::from_secs(2);

/// Result of one tick.
#[derive(Debug)]
pub enum TickOutcome {
    Collected(Sample),
    Failed(SampleError),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub samples: Vec<Sample>,
    pub error_count: u64,
    pub checkpoints_saved: u64,
    /// Stopped by the shutdown signal before the planned sample count.
    pub interrupted: bool,
    pub start_time: DateTime<Utc>,
    pub total_samples: u64,
}

/// Source, checkpoint file and shutdown signal for one run.
pub struct SamplerDeps<'a, S> {
    pub source: &'a mut S,
    pub store: &'a CheckpointStore,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// State restored from a checkpoint, or a fresh start.
struct Resumed {
    samples: Vec<Sample>,
    start_time: DateTime<Utc>,
    error_count: u64,
}

async fn restore(plan: &RunPlan, total: u64) -> Result<Option<Resumed>, RunError> {
    let Some(path) = &plan.resume_from else {
        return Ok(None);
    };
    let Some(record) = CheckpointStore::load(path).await else {
        return Ok(None);
    };
    if record.total_samples != total
        || record.samples_collected > total
        || record.samples.len() as u64 != record.samples_collected
    {
        return Err(RunError::ResumeMismatch {
            path: path.display().to_string(),
            checkpoint_total: record.total_samples,
            checkpoint_collected: record.samples_collected,
            run_total: total,
        });
    }
    tracing::info!(
        path = %path.display(),
        resume_index = record.resume_index(),
        total_samples = total,
        error_count = record.error_count,
        "Resuming from checkpoint"
    );
    Ok(Some(Resumed {
        samples: record.samples,
        start_time: record.start_time,
        error_count: record.error_count,
    }))
}

/// Fetch one row under the query timeout and turn it into a sample.
pub async fn tick<S: SampleSource>(
    source: &mut S,
    previous: Option<&Sample>,
    plan: &RunPlan,
) -> TickOutcome {
    let timeout = Duration::from_secs(plan.query_timeout_secs);
    let row = match tokio::time::timeout(timeout, source.fetch()).await {
        Ok(Ok(row)) => row,
        Ok(Err(e)) => return TickOutcome::Failed(SampleError::Source(e)),
        Err(_) => return TickOutcome::Failed(SampleError::Timeout(plan.query_timeout_secs)),
    };
    let timestamp = row
        .sample_time
        .unwrap_or_else(|| chrono::Local::now().naive_local());
    match Sample::from_row(
        row,
        timestamp,
        previous,
        plan.interval_seconds,
        plan.cpu_accounting,
    ) {
        Ok(sample) => TickOutcome::Collected(sample),
        Err(e) => TickOutcome::Failed(e),
    }
}

/// One test fetch before sampling starts. A source that cannot produce a valid row fails the
/// run here instead of failing every tick. Returns how long the query took.
pub async fn preflight<S: SampleSource>(
    source: &mut S,
    plan: &RunPlan,
) -> Result<Duration, RunError> {
    let started = Instant::now();
    let outcome = tick(source, None, plan).await;
    let took = started.elapsed();
    match outcome {
        TickOutcome::Collected(_) if took > SLOW_QUERY => {
            tracing::warn!(
                elapsed_ms = took.as_millis() as u64,
                interval_seconds = plan.interval_seconds,
                "Sample query is slow; consider a longer interval"
            );
            Ok(took)
        }
        TickOutcome::Collected(_) => {
            tracing::info!(elapsed_ms = took.as_millis() as u64, "Sample query test passed");
            Ok(took)
        }
        TickOutcome::Failed(e) => Err(RunError::InvalidConfiguration(format!(
            "sample query test failed: {}",
            e
        ))),
    }
}

/// Wall-clock time `remaining_secs` from now, formatted for logs.
fn estimated_end(remaining_secs: u64) -> String {
    i64::try_from(remaining_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|d| Local::now().checked_add_signed(d))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".into())
}

/// Wait for the next tick. Returns `true` when shutdown was requested first.
/// A dropped sender means no shutdown will ever arrive.
async fn wait_next(
    tick: &mut tokio::time::Interval,
    shutdown_rx: &mut oneshot::Receiver<()>,
    shutdown_closed: &mut bool,
) -> bool {
    loop {
        tokio::select! {
            _ = tick.tick() => return false,
            res = &mut *shutdown_rx, if !*shutdown_closed => match res {
                Ok(()) => return true,
                Err(_) => *shutdown_closed = true,
            },
        }
    }
}

/// Run the sampling loop to completion or until shutdown.
/// Fails only on an inconsistent plan or resume checkpoint, before the first fetch.
#[instrument(
    name = "sampler",
    skip_all,
    fields(server = %plan.server, interval_seconds = plan.interval_seconds)
)]
pub async fn run<S: SampleSource>(
    plan: &RunPlan,
    deps: SamplerDeps<'_, S>,
) -> Result<RunOutcome, RunError> {
    let SamplerDeps {
        source,
        store,
        mut shutdown_rx,
    } = deps;
    plan.validate()?;
    let total = plan.total_samples();

    let (mut samples, start_time, mut error_count) = match restore(plan, total).await? {
        Some(r) => (r.samples, r.start_time, r.error_count),
        None => (Vec::new(), Utc::now(), 0),
    };
    let start_index = samples.len() as u64;
    // Failed ticks consumed source rows too.
    source.resume_at(start_index + error_count);

    let remaining_secs = (total - start_index).saturating_mul(plan.interval_seconds);
    tracing::info!(
        total_samples = total,
        start_index,
        duration_minutes = plan.duration_minutes,
        checkpoint_path = %store.path().display(),
        estimated_end = %estimated_end(remaining_secs),
        "Sampling started"
    );

    let period = Duration::from_secs(plan.interval_seconds);
    let checkpoint_every =
        Duration::from_secs(plan.checkpoint_interval_minutes.saturating_mul(60));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut next_checkpoint = Instant::now() + checkpoint_every;
    let mut checkpoints_saved: u64 = 0;
    let mut shutdown_closed = false;
    let mut interrupted = false;

    for index in start_index..total {
        match tick(source, samples.last(), plan).await {
            TickOutcome::Collected(sample) => {
                let remaining = total - index - 1;
                tracing::info!(
                    index,
                    progress_percent = %format!("{:.1}", progress_percent(index + 1, total)),
                    remaining,
                    elapsed = %format_duration((Utc::now() - start_time).num_seconds()),
                    eta = %estimated_end(remaining.saturating_mul(plan.interval_seconds)),
                    used_cpu_cores = ?sample.used_cpu_cores,
                    committed_memory_mb = sample.committed_memory_mb,
                    user_connections = sample.user_connections,
                    "Sample collected"
                );
                samples.push(sample);
            }
            TickOutcome::Failed(e) => {
                error_count += 1;
                tracing::warn!(
                    error = %e,
                    index,
                    error_count,
                    operation = "collect_sample",
                    "Sample collection failed"
                );
            }
        }

        if Instant::now() >= next_checkpoint {
            match store.save(&samples, start_time, total, error_count).await {
                Ok(()) => {
                    checkpoints_saved += 1;
                    tracing::info!(
                        samples_collected = samples.len(),
                        total_samples = total,
                        error_count,
                        "Checkpoint saved"
                    );
                }
                Err(e) => tracing::warn!(
                    error = %e,
                    operation = "save_checkpoint",
                    "Checkpoint save failed; retrying at next schedule"
                ),
            }
            next_checkpoint = Instant::now() + checkpoint_every;
        }

        if index + 1 == total {
            break;
        }
        if wait_next(&mut ticker, &mut shutdown_rx, &mut shutdown_closed).await {
            interrupted = true;
            tracing::info!(
                samples_collected = samples.len(),
                "Shutdown requested; saving checkpoint"
            );
            match store.save(&samples, start_time, total, error_count).await {
                Ok(()) => checkpoints_saved += 1,
                Err(e) => tracing::warn!(
                    error = %e,
                    operation = "save_checkpoint",
                    "Final checkpoint save failed"
                ),
            }
            break;
        }
    }

    tracing::info!(
        samples_collected = samples.len(),
        error_count,
        checkpoints_saved,
        interrupted,
        "Sampling finished"
    );
    Ok(RunOutcome {
        samples,
        error_count,
        checkpoints_saved,
        interrupted,
        start_time,
        total_samples: total,
    })
}

#[cfg(test)]
mod tests {
    use super::estimated_end;

    #[test]
    fn estimated_end_is_a_local_timestamp() {
        let end = estimated_end(3_600);
        assert!(chrono::NaiveDateTime::parse_from_str(&end, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[test]
    fn estimated_end_out_of_range_is_unknown() {
        assert_eq!(estimated_end(u64::MAX), "unknown");
    }
}
