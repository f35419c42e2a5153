// Command source: runs an external program per tick (e.g. a sqlcmd wrapper around the
// versioned sample query) and parses the single JSON row it prints.

use tokio::process::Command;

use crate::models::RawCounterRow;

use super::SampleSource;

pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

impl SampleSource for CommandSource {
    async fn fetch(&mut self) -> anyhow::Result<RawCounterRow> {
        // kill_on_drop: the sampler drops this future when the query timeout fires.
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("spawn {}: {}", self.program, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(stdout.trim())
            .map_err(|e| anyhow::anyhow!("parse row from {}: {}", self.program, e))
    }
}
