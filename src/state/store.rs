//! The narrow capability the pipeline needs from a catalog
//!
//! Reconciliation and the writer only ever run one of a few fixed joins and
//! a single `updated_at` update, so that is all this trait exposes. The
//! SQLite-backed `Library` implements it, and so does a raw
//! `rusqlite::Connection` (which lets the writer hand out a transaction).

use rusqlite::types::{Value, ValueRef};

use crate::error::Result;

/// Join of `metadata_items`, `media_items` and `media_parts` used for the
/// recent-media listing
pub const RECENT_MEDIA_QUERY: &str = "
    SELECT
        metadata_items.id,
        metadata_items.title,
        metadata_items.added_at,
        metadata_items.created_at,
        metadata_items.updated_at,
        metadata_items.library_section_id,
        media_parts.file AS file_path
    FROM metadata_items
    JOIN media_items ON metadata_items.id = media_items.metadata_item_id
    JOIN media_parts ON media_items.id = media_parts.media_item_id
    WHERE metadata_items.title IS NOT NULL
    AND media_parts.file IS NOT NULL
    AND LENGTH(media_parts.file) > 0
    ORDER BY metadata_items.updated_at DESC";

/// Wide join carrying every column a snapshot needs to describe an item
pub const FULL_EXPORT_QUERY: &str = "
    SELECT
        metadata_items.id,
        metadata_items.metadata_type,
        metadata_items.media_item_count,
        metadata_items.title,
        metadata_items.title_sort,
        metadata_items.original_title,
        metadata_items.studio,
        metadata_items.rating,
        metadata_items.rating_count,
        metadata_items.tagline,
        metadata_items.summary,
        metadata_items.content_rating,
        metadata_items.duration,
        metadata_items.user_thumb_url,
        metadata_items.user_art_url,
        metadata_items.user_banner_url,
        metadata_items.user_music_url,
        metadata_items.tags_genre,
        metadata_items.tags_director,
        metadata_items.tags_writer,
        metadata_items.tags_star,
        metadata_items.originally_available_at,
        metadata_items.available_at,
        metadata_items.added_at,
        metadata_items.created_at,
        metadata_items.updated_at,
        metadata_items.library_section_id,
        metadata_items.parent_id,
        metadata_items.hash,
        media_items.id AS media_item_id,
        media_items.size,
        media_items.width,
        media_items.height,
        media_items.container,
        media_items.video_codec,
        media_items.audio_codec,
        media_parts.id AS media_part_id,
        media_parts.file AS original_file_path,
        media_parts.size AS part_size,
        media_parts.duration AS part_duration,
        media_parts.created_at AS part_created_at,
        media_parts.updated_at AS part_updated_at
    FROM metadata_items
    JOIN media_items ON metadata_items.id = media_items.metadata_item_id
    JOIN media_parts ON media_items.id = media_parts.media_item_id
    WHERE media_parts.file IS NOT NULL
    AND LENGTH(media_parts.file) > 0
    ORDER BY metadata_items.updated_at DESC
    LIMIT ?1";

/// Bare file paths, used to check how well the mapping rules cover the catalog
pub const FILE_PATHS_QUERY: &str = "
    SELECT file FROM media_parts
    WHERE file IS NOT NULL AND LENGTH(file) > 0
    LIMIT ?1";

pub const UPDATE_TIMESTAMP_SQL: &str = "UPDATE metadata_items SET updated_at = ?1 WHERE id = ?2";

/// Which join to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSpec {
    Recent,
    FullExport { limit: Option<usize> },
    FilePaths { limit: Option<usize> },
}

impl JoinSpec {
    /// Name of the column holding the media file path
    pub fn path_column(&self) -> &'static str {
        match self {
            JoinSpec::Recent => "file_path",
            JoinSpec::FullExport { .. } => "original_file_path",
            JoinSpec::FilePaths { .. } => "file",
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            JoinSpec::Recent => RECENT_MEDIA_QUERY,
            JoinSpec::FullExport { .. } => FULL_EXPORT_QUERY,
            JoinSpec::FilePaths { .. } => FILE_PATHS_QUERY,
        }
    }

    /// SQLite treats a negative LIMIT as "no limit"
    pub fn limit_param(&self) -> Option<i64> {
        match self {
            JoinSpec::Recent => None,
            JoinSpec::FullExport { limit } | JoinSpec::FilePaths { limit } => {
                Some(limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX)))
            }
        }
    }
}

/// Query result: column names in query order plus raw values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

pub trait CatalogStore {
    fn query(&self, spec: &JoinSpec) -> Result<RowSet>;

    /// Set `updated_at` for one metadata item; returns the number of rows changed
    fn update_timestamp(&self, id: i64, timestamp: i64) -> Result<usize>;
}

impl CatalogStore for rusqlite::Connection {
    fn query(&self, spec: &JoinSpec) -> Result<RowSet> {
        let mut stmt = self.prepare(spec.sql())?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let read_row = |row: &rusqlite::Row<'_>| {
            (0..width)
                .map(|i| row.get_ref(i).map(owned_value))
                .collect::<rusqlite::Result<Vec<Value>>>()
        };

        let rows = match spec.limit_param() {
            Some(limit) => stmt
                .query_map([limit], read_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map([], read_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };

        Ok(RowSet { columns, rows })
    }

    fn update_timestamp(&self, id: i64, timestamp: i64) -> Result<usize> {
        let changed = self.execute(UPDATE_TIMESTAMP_SQL, rusqlite::params![timestamp, id])?;
        Ok(changed)
    }
}

/// Like `Value::from`, but text that is not valid UTF-8 is decoded lossily
/// instead of panicking
fn owned_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}
