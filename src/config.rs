use serde::Deserialize;

use crate::models::CpuAccounting;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub run: RunConfig,
    pub source: SourceConfig,
    pub sizing: SizingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Opaque target identifier, recorded in checkpoints and the result document.
    pub server: String,
    pub duration_minutes: u64,
    pub interval_seconds: u64,
    #[serde(default = "default_checkpoint_interval_minutes")]
    pub checkpoint_interval_minutes: u64,
    pub output_path: String,
    /// Defaults to `<output>_checkpoint.json`.
    #[serde(default)]
    pub checkpoint_path: Option<String>,
    #[serde(default)]
    pub resume_from: Option<String>,
    /// Upper bound for one sample query; a timeout counts as a failed tick.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default)]
    pub cpu_accounting: CpuAccounting,
}

fn default_checkpoint_interval_minutes() -> u64 {
    60
}

fn default_query_timeout_secs() -> u64 {
    30
}

/// Where counter rows come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// JSON-lines file of counter rows, one row per tick.
    Replay { path: String },
    /// External program printing one JSON counter row on stdout per invocation.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    pub catalog_path: String,
    #[serde(default = "default_headroom")]
    pub headroom: f64,
    #[serde(default = "default_min_vcpus")]
    pub min_vcpus: u32,
    #[serde(default = "default_min_memory_gb")]
    pub min_memory_gb: u64,
    #[serde(default = "default_max_stripe_units")]
    pub max_stripe_units: u32,
}

fn default_headroom() -> f64 {
    1.2
}

fn default_min_vcpus() -> u32 {
    4
}

fn default_min_memory_gb() -> u64 {
    8
}

fn default_max_stripe_units() -> u32 {
    8
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            catalog_path: String::new(),
            headroom: default_headroom(),
            min_vcpus: default_min_vcpus(),
            min_memory_gb: default_min_memory_gb(),
            max_stripe_units: default_max_stripe_units(),
        }
    }
}

impl RunConfig {
    /// Planned number of samples: floor(duration * 60 / interval).
    pub fn total_samples(&self) -> u64 {
        total_samples(self.duration_minutes, self.interval_seconds)
    }

    pub fn checkpoint_path(&self) -> String {
        self.checkpoint_path
            .clone()
            .unwrap_or_else(|| sibling_path(&self.output_path, "_checkpoint.json"))
    }

    pub fn summary_csv_path(&self) -> String {
        sibling_path(&self.output_path, "_summary.csv")
    }
}

/// 0 when the interval is zero or the duration does not fit in seconds.
pub fn total_samples(duration_minutes: u64, interval_seconds: u64) -> u64 {
    duration_minutes
        .checked_mul(60)
        .and_then(|secs| secs.checked_div(interval_seconds))
        .unwrap_or(0)
}

/// Whether the duration can be expressed in seconds without overflow.
pub fn duration_minutes_fit(duration_minutes: u64) -> bool {
    duration_minutes.checked_mul(60).is_some()
}

/// `results.json` + `_checkpoint.json` -> `results_checkpoint.json`.
pub fn sibling_path(output_path: &str, suffix: &str) -> String {
    let stem = output_path.strip_suffix(".json").unwrap_or(output_path);
    format!("{}{}", stem, suffix)
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-validate.
    pub fn with_overrides(
        mut self,
        duration_minutes: Option<u64>,
        interval_seconds: Option<u64>,
        resume_from: Option<String>,
    ) -> anyhow::Result<Self> {
        if let Some(d) = duration_minutes {
            self.run.duration_minutes = d;
        }
        if let Some(i) = interval_seconds {
            self.run.interval_seconds = i;
        }
        if resume_from.is_some() {
            self.run.resume_from = resume_from;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.run.server.is_empty(), "run.server must be non-empty");
        anyhow::ensure!(
            self.run.duration_minutes > 0,
            "run.duration_minutes must be > 0, got {}",
            self.run.duration_minutes
        );
        anyhow::ensure!(
            self.run.interval_seconds > 0,
            "run.interval_seconds must be > 0, got {}",
            self.run.interval_seconds
        );
        anyhow::ensure!(
            duration_minutes_fit(self.run.duration_minutes),
            "run.duration_minutes is too large, got {}",
            self.run.duration_minutes
        );
        anyhow::ensure!(
            self.run.total_samples() > 0,
            "run.duration_minutes ({} min) must cover at least one run.interval_seconds ({} s)",
            self.run.duration_minutes,
            self.run.interval_seconds
        );
        anyhow::ensure!(
            self.run.checkpoint_interval_minutes > 0,
            "run.checkpoint_interval_minutes must be > 0, got {}",
            self.run.checkpoint_interval_minutes
        );
        anyhow::ensure!(
            !self.run.output_path.is_empty(),
            "run.output_path must be non-empty"
        );
        anyhow::ensure!(
            self.run.query_timeout_secs > 0,
            "run.query_timeout_secs must be > 0, got {}",
            self.run.query_timeout_secs
        );
        match &self.source {
            SourceConfig::Replay { path } => {
                anyhow::ensure!(!path.is_empty(), "source.path must be non-empty")
            }
            SourceConfig::Command { program, .. } => {
                anyhow::ensure!(!program.is_empty(), "source.program must be non-empty")
            }
        }
        anyhow::ensure!(
            !self.sizing.catalog_path.is_empty(),
            "sizing.catalog_path must be non-empty"
        );
        anyhow::ensure!(
            self.sizing.headroom.is_finite() && self.sizing.headroom >= 1.0,
            "sizing.headroom must be >= 1.0, got {}",
            self.sizing.headroom
        );
        anyhow::ensure!(
            self.sizing.min_vcpus > 0,
            "sizing.min_vcpus must be > 0, got {}",
            self.sizing.min_vcpus
        );
        anyhow::ensure!(
            self.sizing.max_stripe_units >= 2,
            "sizing.max_stripe_units must be >= 2, got {}",
            self.sizing.max_stripe_units
        );
        Ok(())
    }
}
