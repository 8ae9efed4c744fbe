use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{RepairError, Result};

/// Label used for rows without a library section
const UNKNOWN_LIBRARY: &str = "Unknown";

/// Summary of a snapshot file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub total: usize,
    pub files_found: usize,
    pub files_missing: usize,
    pub paths_mapped: usize,
    /// Rows whose `new_updated_at` differs from `updated_at`
    pub updates_pending: usize,
    /// Row count per library section id
    pub libraries: BTreeMap<String, usize>,
    /// Rows that could not be read at all; not part of `total`
    pub rows_skipped: usize,
}

impl SnapshotSummary {
    pub fn found_percent(&self) -> f64 {
        percent(self.files_found, self.total)
    }

    pub fn missing_percent(&self) -> f64 {
        percent(self.files_missing, self.total)
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Deserialize)]
struct SummaryRow {
    file_exists: Option<String>,
    path_was_mapped: Option<String>,
    updated_at: Option<String>,
    new_updated_at: Option<String>,
    library_section_id: Option<String>,
}

pub fn summarize<R: Read>(input: R) -> Result<SnapshotSummary> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let mut summary = SnapshotSummary::default();

    for row in reader.deserialize::<SummaryRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(_) => {
                summary.rows_skipped += 1;
                continue;
            }
        };
        summary.total += 1;

        if row.file_exists.as_deref() == Some("true") {
            summary.files_found += 1;
        } else {
            summary.files_missing += 1;
        }
        if row.path_was_mapped.as_deref() == Some("true") {
            summary.paths_mapped += 1;
        }
        if row.updated_at != row.new_updated_at {
            summary.updates_pending += 1;
        }

        let library = row
            .library_section_id
            .unwrap_or_else(|| UNKNOWN_LIBRARY.to_string());
        *summary.libraries.entry(library).or_insert(0) += 1;
    }

    Ok(summary)
}

pub fn summarize_path(path: &Path) -> Result<SnapshotSummary> {
    let file = File::open(path).map_err(|e| RepairError::io(path, e))?;
    summarize(file)
}
