// Monitoring pipeline: sample -> aggregate -> peaks -> sizing -> result document.
// The checkpoint is removed only after the result document is on disk.

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::oneshot;

use crate::analysis::{aggregate_hourly, find_peaks, overall_stats};
use crate::checkpoint_store::CheckpointStore;
use crate::config::AppConfig;
use crate::error::SizingError;
use crate::models::{
    Catalog, CheckpointRecord, HourlyBucket, OverallStats, PeakSummary, ResultDocument,
    RunMetadata, Sample, SizingRecommendation,
};
use crate::result_writer::ResultWriter;
use crate::sampler::{self, RunOutcome, RunPlan, SamplerDeps};
use crate::sizing::{self, SizingPolicy};
use crate::source::SampleSource;
use crate::version;

#[derive(Debug)]
pub enum MonitorOutcome {
    Completed(Box<ResultDocument>),
    /// Stopped by shutdown; the run can be resumed from `checkpoint_path`.
    Interrupted {
        samples_collected: u64,
        total_samples: u64,
        checkpoint_path: String,
    },
}

/// Everything derived from a run's samples.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub overall: OverallStats,
    pub hourly: Vec<HourlyBucket>,
    pub peaks: PeakSummary,
    pub recommendation: SizingRecommendation,
}

impl Analysis {
    pub fn into_document(self, metadata: RunMetadata, samples: Vec<Sample>) -> ResultDocument {
        ResultDocument {
            metadata,
            overall: self.overall,
            hourly: self.hourly,
            peaks: self.peaks,
            recommendation: self.recommendation,
            samples,
        }
    }
}

/// Derive hourly buckets, peaks, overall stats and the recommendation from collected samples.
pub fn analyze(
    samples: &[Sample],
    catalog: &Catalog,
    policy: &SizingPolicy,
) -> Result<Analysis, SizingError> {
    let hourly = aggregate_hourly(samples);
    let peaks = find_peaks(&hourly);
    let overall = overall_stats(samples, &hourly);
    let recommendation = sizing::recommend(&overall, catalog, policy)?;
    Ok(Analysis {
        overall,
        hourly,
        peaks,
        recommendation,
    })
}

/// Keep the samples resumable when the result document could not be produced.
async fn save_best_effort(store: &CheckpointStore, samples: &[Sample], run: &RunOutcome) {
    if let Err(e) = store
        .save(samples, run.start_time, run.total_samples, run.error_count)
        .await
    {
        tracing::error!(
            error = %e,
            operation = "save_checkpoint",
            "Checkpoint save after failed result also failed"
        );
    }
}

/// Run one monitoring session end to end. A failing test query aborts before sampling.
pub async fn run<S: SampleSource>(
    config: &AppConfig,
    catalog: &Catalog,
    source: &mut S,
    shutdown_rx: oneshot::Receiver<()>,
) -> anyhow::Result<MonitorOutcome> {
    let plan = RunPlan::from(&config.run);
    plan.validate()?;
    sampler::preflight(source, &plan).await?;
    let store = CheckpointStore::new(config.run.checkpoint_path(), &plan);
    let mut outcome = sampler::run(
        &plan,
        SamplerDeps {
            source,
            store: &store,
            shutdown_rx,
        },
    )
    .await?;

    if outcome.interrupted {
        return Ok(MonitorOutcome::Interrupted {
            samples_collected: outcome.samples.len() as u64,
            total_samples: outcome.total_samples,
            checkpoint_path: store.path().display().to_string(),
        });
    }

    let metadata = RunMetadata {
        version: version::VERSION.to_string(),
        server: plan.server.clone(),
        start_time: outcome.start_time,
        end_time: Utc::now(),
        duration_minutes: plan.duration_minutes,
        interval_seconds: plan.interval_seconds,
        total_samples: outcome.total_samples,
        samples_collected: outcome.samples.len() as u64,
        error_count: outcome.error_count,
    };
    let policy = SizingPolicy::from(&config.sizing);

    let analysis = match analyze(&outcome.samples, catalog, &policy) {
        Ok(a) => a,
        Err(e) => {
            save_best_effort(&store, &outcome.samples, &outcome).await;
            return Err(e.into());
        }
    };
    let doc = analysis.into_document(metadata, std::mem::take(&mut outcome.samples));
    if let Err(e) = ResultWriter::from_config(&config.run).write(&doc).await {
        save_best_effort(&store, &doc.samples, &outcome).await;
        return Err(e);
    }

    if let Err(e) = store.remove().await {
        tracing::warn!(
            error = %e,
            path = %store.path().display(),
            operation = "remove_checkpoint",
            "Failed to remove checkpoint after successful run"
        );
    }
    tracing::info!(
        samples_collected = doc.metadata.samples_collected,
        total_samples = doc.metadata.total_samples,
        error_count = doc.metadata.error_count,
        compute_sku = %doc.recommendation.compute_sku,
        total_monthly_cost = doc.recommendation.total_monthly_cost,
        "Monitoring complete"
    );
    Ok(MonitorOutcome::Completed(Box::new(doc)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRun {
    Result(Box<ResultDocument>),
    Checkpoint(Box<CheckpointRecord>),
}

/// Re-run analysis and sizing over a stored result document or checkpoint.
/// Run metadata is kept from the file; for a checkpoint it describes the run so far.
pub async fn analyze_file(
    path: &Path,
    catalog: &Catalog,
    policy: &SizingPolicy,
) -> anyhow::Result<ResultDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow::anyhow!("read {}: {}", path.display(), e))?;
    let stored: StoredRun = serde_json::from_slice(&bytes).map_err(|e| {
        anyhow::anyhow!(
            "{} is neither a result document nor a checkpoint: {}",
            path.display(),
            e
        )
    })?;
    let (metadata, samples) = match stored {
        StoredRun::Result(doc) => {
            let doc = *doc;
            (doc.metadata, doc.samples)
        }
        StoredRun::Checkpoint(record) => {
            let record = *record;
            let metadata = RunMetadata {
                version: record.version,
                server: record.server_instance,
                start_time: record.start_time,
                end_time: record.current_time,
                duration_minutes: record.duration_minutes,
                interval_seconds: record.interval_seconds,
                total_samples: record.total_samples,
                samples_collected: record.samples.len() as u64,
                error_count: record.error_count,
            };
            (metadata, record.samples)
        }
    };
    Ok(analyze(&samples, catalog, policy)?.into_document(metadata, samples))
}
