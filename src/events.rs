//! Observation of recovered, per-record conditions
//!
//! Components never log on their own. They are handed an `EventSink` when
//! constructed and report what happened to it; the binary installs a
//! `TracingSink`, tests install a `MemorySink` and inspect the events.

use std::fmt;

/// Why a snapshot row produced no update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `file_exists` was not "true"
    FileMissing,
    /// `id` or `new_updated_at` absent or not an integer
    Unparseable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FileMissing => write!(f, "file not found"),
            SkipReason::Unparseable => write!(f, "unparseable id or timestamp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RepairEvent {
    /// Reading file metadata failed; the path is treated as absent
    ProbeWarning { path: String, error: String },
    /// A catalog row had no usable file path
    RecordWithoutPath { id: i64 },
    /// A catalog row had no integer id
    MalformedRecord { row: usize },
    /// A candidate timestamp fell outside the validity window
    ValidationSkip { id: i64, timestamp: i64 },
    /// An update statement failed against the duplicate catalog
    RecordWriteWarning { id: i64, error: String },
    /// An update statement matched no catalog row
    RecordUnmatched { id: i64 },
    /// A snapshot row was not turned into an update
    RowSkipped { row: usize, reason: SkipReason },
    /// A copy strategy failed and the next one will be tried
    CopyFallback { strategy: String, error: String },
    /// Periodic progress through a batch
    Progress { processed: usize },
}

pub trait EventSink {
    fn emit(&self, event: RepairEvent);
}

/// Forwards every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: RepairEvent) {
        match event {
            RepairEvent::ProbeWarning { path, error } => {
                tracing::warn!(%path, %error, "error reading file metadata");
            }
            RepairEvent::RecordWithoutPath { id } => {
                tracing::debug!(id, "catalog record has no file path");
            }
            RepairEvent::MalformedRecord { row } => {
                tracing::warn!(row, "catalog row has no integer id, ignored");
            }
            RepairEvent::ValidationSkip { id, timestamp } => {
                let when = chrono::DateTime::from_timestamp(timestamp, 0)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| "out of range".to_string());
                tracing::warn!(id, timestamp, %when, "skipping invalid timestamp");
            }
            RepairEvent::RecordWriteWarning { id, error } => {
                tracing::warn!(id, %error, "failed to update item");
            }
            RepairEvent::RecordUnmatched { id } => {
                tracing::warn!(id, "update matched no catalog row");
            }
            RepairEvent::RowSkipped { row, reason } => {
                tracing::debug!(row, %reason, "snapshot row skipped");
            }
            RepairEvent::CopyFallback { strategy, error } => {
                tracing::warn!(%strategy, %error, "copy strategy failed, trying next");
            }
            RepairEvent::Progress { processed } => {
                tracing::info!("Processed {} records...", processed);
            }
        }
    }
}

/// Records events for later inspection
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    events: std::cell::RefCell<Vec<RepairEvent>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn events(&self) -> Vec<RepairEvent> {
        self.events.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&RepairEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }
}

#[cfg(test)]
impl EventSink for MemorySink {
    fn emit(&self, event: RepairEvent) {
        self.events.borrow_mut().push(event);
    }
}
