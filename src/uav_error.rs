//! Errors surfaced by snapshot, report and configuration I/O
//!
//! Undefined statistics are not errors (they are `None`), and broken log
//! invariants panic, so this only covers the outside world.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot (de)serialization failed: {0}")]
    Encode(#[from] bincode::Error),

    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid mission configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File does not start with the snapshot magic bytes
    #[error("not a metrics snapshot")]
    BadMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),

    /// Snapshot decoded, but its log breaks the delivery ordering invariants
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

impl MetricsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MetricsError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type MetricsResult<T> = Result<T, MetricsError>;
