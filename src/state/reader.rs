//! Turns raw catalog rows into `CatalogRecord`s

use rusqlite::types::Value;
use std::rc::Rc;

use super::data::{CatalogRecord, RawRow};
use super::store::{CatalogStore, JoinSpec, RowSet};
use crate::error::{RepairError, Result};
use crate::events::{EventSink, RepairEvent};

/// Records from one query, with the query's column order
#[derive(Debug, Clone, Default)]
pub struct CatalogRows {
    pub columns: Vec<String>,
    pub records: Vec<CatalogRecord>,
}

/// Run `spec` and convert its rows. Rows without a usable file path never
/// become records.
pub fn read_records(
    store: &dyn CatalogStore,
    spec: &JoinSpec,
    sink: &dyn EventSink,
) -> Result<CatalogRows> {
    let rows = store.query(spec)?;
    records_from_rows(rows, spec.path_column(), sink)
}

pub fn records_from_rows(rows: RowSet, path_column: &str, sink: &dyn EventSink) -> Result<CatalogRows> {
    let id_idx = rows
        .column_index("id")
        .ok_or_else(|| RepairError::MissingColumn("id".to_string()))?;
    let path_idx = rows
        .column_index(path_column)
        .ok_or_else(|| RepairError::MissingColumn(path_column.to_string()))?;
    let title_idx = rows.column_index("title");
    let added_idx = rows.column_index("added_at");
    let created_idx = rows.column_index("created_at");
    let updated_idx = rows.column_index("updated_at");
    let library_idx = rows.column_index("library_section_id");

    let columns: Rc<[String]> = rows.columns.clone().into();
    let mut records = Vec::with_capacity(rows.rows.len());

    for (row_num, values) in rows.rows.into_iter().enumerate() {
        let cell = |idx: Option<usize>| idx.and_then(|i| values.get(i));

        let Some(id) = cell(Some(id_idx)).and_then(as_integer) else {
            sink.emit(RepairEvent::MalformedRecord { row: row_num + 1 });
            continue;
        };

        let file_path = cell(Some(path_idx)).map(as_text).unwrap_or_default();
        if file_path.trim().is_empty() {
            sink.emit(RepairEvent::RecordWithoutPath { id });
            continue;
        }

        let title = cell(title_idx)
            .filter(|v| !matches!(v, Value::Null))
            .map(as_text);

        let record = CatalogRecord {
            id,
            title,
            added_at: cell(added_idx).and_then(as_timestamp),
            created_at: cell(created_idx).and_then(as_timestamp),
            updated_at: cell(updated_idx).and_then(as_timestamp),
            library_section_id: cell(library_idx).and_then(as_integer),
            file_path,
            raw: RawRow {
                columns: Rc::clone(&columns),
                values: values.iter().map(as_text).collect(),
            },
        };
        records.push(record);
    }

    Ok(CatalogRows {
        columns: rows.columns,
        records,
    })
}

/// Render a value the way it should appear in a snapshot cell
pub fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(n) => n.to_string(),
        // keeps the fractional part: 7.0 stays "7.0"
        Value::Real(f) => format!("{f:?}"),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(n) => Some(*n),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Catalog timestamps are epoch seconds; zero, negative or non-numeric
/// values mean "not set"
pub fn as_timestamp(value: &Value) -> Option<i64> {
    let ts = match value {
        Value::Real(f) if f.is_finite() => *f as i64,
        other => as_integer(other)?,
    };
    (ts > 0).then_some(ts)
}
