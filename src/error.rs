// Typed errors for the sampling pipeline. Application plumbing uses anyhow on top of these.

use thiserror::Error;

/// Why a single tick produced no sample. Never fatal for the run.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("sample source failed: {0}")]
    Source(#[from] anyhow::Error),

    #[error("sample query timed out after {0}s")]
    Timeout(u64),

    #[error("invalid counter row: {0}")]
    InvalidRow(String),
}

/// Fatal errors raised before any sampling begins.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(
        "checkpoint {path} does not match this run: checkpoint plans {checkpoint_total} samples \
         ({checkpoint_collected} collected), this run plans {run_total}"
    )]
    ResumeMismatch {
        path: String,
        checkpoint_total: u64,
        checkpoint_collected: u64,
        run_total: u64,
    },
}

#[derive(Debug, Error)]
pub enum SizingError {
    #[error("compute catalog is empty")]
    EmptyComputeCatalog,
}
