//! Snapshot files: a CSV rendering of one reconciliation pass
//!
//! A snapshot carries every catalog column of each entry followed by the
//! derived columns below. Import reads only `id`, `file_exists` and
//! `new_updated_at` by header name, so a snapshot stays replayable after the
//! catalog schema gains or reorders columns, and after hand edits.

use chrono::SecondsFormat;
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::rc::Rc;

use crate::error::{RepairError, Result};
use crate::events::{EventSink, RepairEvent, SkipReason};
use crate::reconcile::validity::ValidityWindow;
use crate::state::data::{PendingUpdate, ResolvedEntry};

/// Columns appended after the catalog columns, in this order
pub const DERIVED_COLUMNS: [&str; 6] = [
    "file_exists",
    "actual_file_path",
    "file_mtime",
    "file_mtime_timestamp",
    "path_was_mapped",
    "new_updated_at",
];

/// Columns import cannot work without
const REQUIRED_COLUMNS: [&str; 3] = ["id", "file_exists", "new_updated_at"];

/// What an import produced and why the other rows were passed over
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub updates: Vec<PendingUpdate>,
    pub rows_read: usize,
    pub skipped_missing_file: usize,
    pub skipped_unparseable: usize,
    pub skipped_invalid: usize,
}

impl ImportOutcome {
    /// An import that yields nothing to apply is a failed run
    pub fn is_success(&self) -> bool {
        !self.updates.is_empty()
    }
}

/// The part of a snapshot row import cares about
#[derive(Debug, Deserialize)]
struct ReplayRow {
    id: Option<String>,
    file_exists: Option<String>,
    new_updated_at: Option<String>,
}

pub struct SnapshotCodec {
    sink: Rc<dyn EventSink>,
}

impl SnapshotCodec {
    pub fn new(sink: Rc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Write one row per entry. `columns` is the catalog query's column
    /// order; every entry is expected to come from that same query.
    pub fn export<W: Write>(
        &self,
        columns: &[String],
        entries: &[ResolvedEntry],
        out: W,
    ) -> Result<usize> {
        let mut writer = csv::Writer::from_writer(out);

        let header = columns
            .iter()
            .map(String::as_str)
            .chain(DERIVED_COLUMNS.iter().copied());
        writer.write_record(header)?;

        for entry in entries {
            let mut record: Vec<String> = columns
                .iter()
                .map(|c| entry.record.raw.get(c).unwrap_or_default().to_string())
                .collect();
            record.extend(derived_values(entry));
            writer.write_record(&record)?;
        }

        writer.flush().map_err(|e| RepairError::io("snapshot", e))?;
        Ok(entries.len())
    }

    pub fn export_to_path(
        &self,
        path: &Path,
        columns: &[String],
        entries: &[ResolvedEntry],
    ) -> Result<usize> {
        let file = File::create(path).map_err(|e| RepairError::io(path, e))?;
        self.export(columns, entries, file)
    }

    /// Turn snapshot rows back into updates.
    ///
    /// Rows are gated on `file_exists == "true"` and an integer id and
    /// `new_updated_at`; with a `validity` window the surviving updates are
    /// filtered through it as well. Skipped rows, including rows with too
    /// few or too many cells, are counted and reported, never fatal. Rows keep file order and are not deduplicated by id.
    pub fn import<R: Read>(&self, input: R, validity: Option<ValidityWindow>) -> Result<ImportOutcome> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);

        let headers = reader.headers()?.clone();
        for required in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == required) {
                return Err(RepairError::MissingColumn(required.to_string()));
            }
        }

        let mut outcome = ImportOutcome::default();
        let mut candidates = Vec::new();

        for (i, row) in reader.deserialize::<ReplayRow>().enumerate() {
            let row_num = i + 1;
            outcome.rows_read += 1;

            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(_) => {
                    outcome.skipped_unparseable += 1;
                    self.sink.emit(RepairEvent::RowSkipped {
                        row: row_num,
                        reason: SkipReason::Unparseable,
                    });
                    continue;
                }
            };

            if row.file_exists.as_deref() != Some("true") {
                outcome.skipped_missing_file += 1;
                self.sink.emit(RepairEvent::RowSkipped {
                    row: row_num,
                    reason: SkipReason::FileMissing,
                });
                continue;
            }

            let id = row.id.as_deref().and_then(parse_integer);
            let timestamp = row.new_updated_at.as_deref().and_then(parse_integer);
            let (Some(record_id), Some(new_timestamp)) = (id, timestamp) else {
                outcome.skipped_unparseable += 1;
                self.sink.emit(RepairEvent::RowSkipped {
                    row: row_num,
                    reason: SkipReason::Unparseable,
                });
                continue;
            };

            candidates.push(PendingUpdate {
                record_id,
                new_timestamp,
            });
        }

        outcome.updates = match validity {
            Some(window) => {
                let before = candidates.len();
                let kept = window.retain_valid(candidates, self.sink.as_ref());
                outcome.skipped_invalid = before - kept.len();
                kept
            }
            None => candidates,
        };

        Ok(outcome)
    }

    pub fn import_from_path(&self, path: &Path, validity: Option<ValidityWindow>) -> Result<ImportOutcome> {
        let file = File::open(path).map_err(|e| RepairError::io(path, e))?;
        self.import(file, validity)
    }
}

fn derived_values(entry: &ResolvedEntry) -> [String; 6] {
    let mtime = entry.resolved_mtime;
    let new_updated_at = match entry.corrected_timestamp() {
        Some(ts) => ts.to_string(),
        None => entry
            .record
            .raw
            .get("updated_at")
            .unwrap_or_default()
            .to_string(),
    };

    [
        entry.file_exists.to_string(),
        entry.resolved_path.clone().unwrap_or_default(),
        mtime
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default(),
        mtime.map(|t| t.timestamp().to_string()).unwrap_or_default(),
        path_was_mapped(entry).to_string(),
        new_updated_at,
    ]
}

/// The resolved path differs from the stored one; a file that was not
/// found has no resolved path, so it counts as mapped too
fn path_was_mapped(entry: &ResolvedEntry) -> bool {
    entry.resolved_path.as_deref() != Some(entry.record.file_path.as_str())
}

fn parse_integer(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}
