//! Shared data structures for the repair pipeline
//!
//! These structs represent the data model that flows between
//! the catalog layer, the reconciliation engine and the snapshot codec.
//! They are plain values: nothing here holds a connection or refers back
//! to the catalog.

use chrono::{DateTime, Utc};
use std::rc::Rc;

/// Catalog column values exactly as the query returned them
///
/// Values are rendered as text (NULL becomes an empty string) so a snapshot
/// can carry every catalog column without knowing its type.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Column names in query order, shared by every row of one query
    pub columns: Rc<[String]>,
    pub values: Vec<String>,
}

impl RawRow {
    /// Look up a column value by name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }
}

/// Represents a single media item in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    /// Primary key of the metadata item
    pub id: i64,
    pub title: Option<String>,
    /// Catalog timestamps in epoch seconds; absent unless positive
    pub added_at: Option<i64>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub library_section_id: Option<i64>,
    /// Full path to the media file as the catalog recorded it
    pub file_path: String,
    /// Every column of the source row
    pub raw: RawRow,
}

/// A catalog record joined with what was found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub record: CatalogRecord,
    /// Path the file was actually found at
    pub resolved_path: Option<String>,
    pub resolved_mtime: Option<DateTime<Utc>>,
    pub file_exists: bool,
    /// True when the file was only found under a remapped path
    pub path_was_remapped: bool,
}

impl ResolvedEntry {
    /// Corrected `updated_at` value, if the file was found
    pub fn corrected_timestamp(&self) -> Option<i64> {
        if self.file_exists {
            self.resolved_mtime.map(|t| t.timestamp())
        } else {
            None
        }
    }
}

/// One `updated_at` correction waiting to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingUpdate {
    pub record_id: i64,
    pub new_timestamp: i64,
}

/// Field used to order reconciled entries (newest first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    FileMtime,
    AddedAt,
    CreatedAt,
    UpdatedAt,
}

impl SortKey {
    /// Value of this key for an entry, in epoch seconds
    pub fn value(self, entry: &ResolvedEntry) -> Option<i64> {
        match self {
            SortKey::FileMtime => entry.resolved_mtime.map(|t| t.timestamp()),
            SortKey::AddedAt => entry.record.added_at,
            SortKey::CreatedAt => entry.record.created_at,
            SortKey::UpdatedAt => entry.record.updated_at,
        }
    }
}
