// Replay source: JSON-lines file of counter rows captured earlier (or produced by another tool).

use crate::models::RawCounterRow;

use super::SampleSource;

pub struct ReplaySource {
    path: String,
    lines: Vec<String>,
    cursor: usize,
}

impl ReplaySource {
    pub async fn open(path: &str) -> anyhow::Result<Self> {
        let s = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("read replay file {}: {}", path, e))?;
        Ok(Self::from_lines(path, &s))
    }

    /// Build from in-memory JSON lines; blank lines are skipped.
    pub fn from_lines(path: &str, s: &str) -> Self {
        let lines = s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        Self {
            path: path.to_string(),
            lines,
            cursor: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.lines.len().saturating_sub(self.cursor)
    }
}

impl SampleSource for ReplaySource {
    async fn fetch(&mut self) -> anyhow::Result<RawCounterRow> {
        let Some(line) = self.lines.get(self.cursor) else {
            anyhow::bail!("replay file {} exhausted after {} rows", self.path, self.lines.len());
        };
        let line_no = self.cursor + 1;
        self.cursor += 1;
        serde_json::from_str(line)
            .map_err(|e| anyhow::anyhow!("{} line {}: {}", self.path, line_no, e))
    }

    fn resume_at(&mut self, consumed: u64) {
        self.cursor = usize::try_from(consumed)
            .unwrap_or(usize::MAX)
            .min(self.lines.len());
    }
}
