// Result output: the JSON document plus a flat per-sample CSV next to it.

use std::fmt::Write as _;
use std::path::PathBuf;

use tracing::instrument;

use crate::checkpoint_store::write_atomic;
use crate::config::RunConfig;
use crate::models::{ResultDocument, Sample};

const CSV_HEADER: &str = "Timestamp,UsedCPUCores,CommittedMemoryMB,BufferPoolMB,\
BatchRequestsPerSec,UserConnections,TotalReads,TotalWrites,TopWaitType,TopWaitTimeMs";

pub struct ResultWriter {
    output_path: PathBuf,
    summary_csv_path: PathBuf,
}

impl ResultWriter {
    pub fn new(output_path: impl Into<PathBuf>, summary_csv_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            summary_csv_path: summary_csv_path.into(),
        }
    }

    pub fn from_config(run: &RunConfig) -> Self {
        Self::new(&run.output_path, run.summary_csv_path())
    }

    /// Write the result document, then the CSV summary. Both are replaced atomically.
    #[instrument(
        skip(self, doc),
        fields(operation = "write_result", samples_count = doc.samples.len())
    )]
    pub async fn write(&self, doc: &ResultDocument) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(doc)?;
        write_atomic(&self.output_path, &json).await?;
        write_atomic(&self.summary_csv_path, summary_csv(&doc.samples).as_bytes()).await?;
        tracing::info!(
            output = %self.output_path.display(),
            summary = %self.summary_csv_path.display(),
            "Results written"
        );
        Ok(())
    }
}

/// One CSV row per sample. CPU is empty for samples without a CPU baseline.
pub fn summary_csv(samples: &[Sample]) -> String {
    let mut out = String::with_capacity(64 * (samples.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for s in samples {
        let cpu = s
            .used_cpu_cores
            .map(|c| format!("{:.3}", c))
            .unwrap_or_default();
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{:.1},{:.1},{:.2},{},{},{},{},{}",
            s.timestamp.format("%Y-%m-%d %H:%M:%S"),
            cpu,
            s.committed_memory_mb,
            s.buffer_pool_mb,
            s.batch_requests_per_sec,
            s.user_connections,
            s.total_reads,
            s.total_writes,
            csv_field(&s.top_wait_type),
            s.top_wait_time_ms,
        );
    }
    out
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::csv_field;

    #[test]
    fn csv_field_quotes_only_when_needed() {
        assert_eq!(csv_field("PAGEIOLATCH_SH"), "PAGEIOLATCH_SH");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
