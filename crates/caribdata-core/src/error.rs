use std::path::PathBuf;

use thiserror::Error;

/// Abort-worthy failures. Everything else in a build run is fail-soft and
/// lands in a source's `_errors.json` instead.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read catalog {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid catalog: {0}")]
    ConfigInvalid(String),

    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
