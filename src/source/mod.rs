// Sample sources: anything that returns one counter row per call.
// The query text and database connectivity live outside this crate; sources only hand back rows.

mod command;
mod replay;

pub use command::CommandSource;
pub use replay::ReplaySource;

use std::future::Future;

use crate::config::SourceConfig;
use crate::models::RawCounterRow;

pub trait SampleSource: Send {
    /// Fetch one counter row. Errors are counted by the sampler and never end the run.
    fn fetch(&mut self) -> impl Future<Output = anyhow::Result<RawCounterRow>> + Send;

    /// Called once before the first sampled tick with the number of fetches the run has already
    /// consumed: collected samples plus failed ticks (0 for a fresh run). Sources that replay a
    /// fixed sequence skip that many rows; the pre-flight test fetch is not counted.
    fn resume_at(&mut self, _consumed: u64) {}
}

/// Source selected by `[source]` in the config file.
pub enum ConfiguredSource {
    Replay(ReplaySource),
    Command(CommandSource),
}

impl ConfiguredSource {
    pub async fn from_config(config: &SourceConfig) -> anyhow::Result<Self> {
        match config {
            SourceConfig::Replay { path } => Ok(Self::Replay(ReplaySource::open(path).await?)),
            SourceConfig::Command { program, args } => {
                Ok(Self::Command(CommandSource::new(program.clone(), args.clone())))
            }
        }
    }
}

impl SampleSource for ConfiguredSource {
    async fn fetch(&mut self) -> anyhow::Result<RawCounterRow> {
        match self {
            Self::Replay(s) => s.fetch().await,
            Self::Command(s) => s.fetch().await,
        }
    }

    fn resume_at(&mut self, consumed: u64) {
        match self {
            Self::Replay(s) => s.resume_at(consumed),
            Self::Command(s) => s.resume_at(consumed),
        }
    }
}
