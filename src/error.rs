use std::path::PathBuf;

use thiserror::Error;

/// Fatal dataset-level failures. The pipeline never proceeds with a
/// partial dataset.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("missing dataset file: {0}")]
    MissingFile(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Delay-model training failures. Recoverable at the engine boundary: the
/// rest of the report is still produced when the model cannot train.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(
        "insufficient training data: {delayed} delayed / {on_time} on-time examples \
         (need at least {min} per class)"
    )]
    InsufficientData {
        delayed: usize,
        on_time: usize,
        min: usize,
    },

    #[error("model fitting failed: {0}")]
    Fit(String),
}
