//! In-memory `CatalogStore` for tests that don't need SQLite

use rusqlite::types::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use super::store::{CatalogStore, JoinSpec, RowSet};
use crate::error::{RepairError, Result};

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    rows: RowSet,
    /// id -> updated_at as written through `update_timestamp`
    pub written: RefCell<BTreeMap<i64, i64>>,
    /// ids whose update fails with a store error
    pub failing_ids: HashSet<i64>,
}

impl MemoryCatalog {
    /// Catalog answering every join with the narrow recent-media columns.
    /// Each item is (id, title, updated_at, file_path).
    pub fn recent(items: &[(i64, &str, Option<i64>, Option<&str>)]) -> Self {
        let columns = [
            "id",
            "title",
            "added_at",
            "created_at",
            "updated_at",
            "library_section_id",
            "file_path",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();

        let rows = items
            .iter()
            .map(|(id, title, updated_at, path)| {
                vec![
                    Value::Integer(*id),
                    Value::Text(title.to_string()),
                    Value::Integer(1_234_567_890),
                    Value::Null,
                    updated_at.map_or(Value::Null, Value::Integer),
                    Value::Integer(1),
                    path.map_or(Value::Null, |p| Value::Text(p.to_string())),
                ]
            })
            .collect();

        MemoryCatalog {
            rows: RowSet { columns, rows },
            ..Default::default()
        }
    }

    pub fn failing_on(mut self, id: i64) -> Self {
        self.failing_ids.insert(id);
        self
    }

    fn known_ids(&self) -> HashSet<i64> {
        self.rows
            .rows
            .iter()
            .filter_map(|r| match r.first() {
                Some(Value::Integer(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl CatalogStore for MemoryCatalog {
    fn query(&self, _spec: &JoinSpec) -> Result<RowSet> {
        Ok(self.rows.clone())
    }

    fn update_timestamp(&self, id: i64, timestamp: i64) -> Result<usize> {
        if self.failing_ids.contains(&id) {
            return Err(RepairError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        if !self.known_ids().contains(&id) {
            return Ok(0);
        }
        self.written.borrow_mut().insert(id, timestamp);
        Ok(1)
    }
}
