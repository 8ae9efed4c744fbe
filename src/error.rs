//! Error types shared by the repair pipeline
//!
//! Only conditions that stop a whole run live here. Per-record problems
//! (unreadable files, out-of-window timestamps, failed row updates) are
//! reported through `events::EventSink` instead and never abort a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, RepairError>;

#[derive(Debug, Error)]
pub enum RepairError {
    /// No usable path mapping rules at resolver construction
    #[error("no path mappings supplied and none found in {}", .0.display())]
    Configuration(PathBuf),

    /// The catalog database does not exist
    #[error("database not found at: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// A query result or snapshot header lacks a column we need
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// Every copy strategy failed, or the destination is the source itself
    #[error("catalog copy failed: {0}")]
    Copy(String),
}

impl RepairError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RepairError::Io {
            path: path.into(),
            source,
        }
    }
}
