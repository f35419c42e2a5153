// Domain models: samples, checkpoints, hourly analysis, catalogs, sizing and the result document

mod catalog;
mod checkpoint;
mod hourly;
mod report;
mod sample;
mod sizing;

pub use catalog::{Catalog, ComputeTier, CustomStoragePricing, StorageTier};
pub use checkpoint::{CheckpointRecord, progress_percent};
pub use hourly::{HourlyBucket, PeakSummary, PeakValue};
pub use report::{MetricStats, OverallStats, ResultDocument, RunMetadata};
pub use sample::{CpuAccounting, RawCounterRow, Sample, cpu_percent};
pub use sizing::{SizingRecommendation, SizingRequirements, StorageConfig, StorageLayout};
