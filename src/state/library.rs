use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

use super::store::{CatalogStore, JoinSpec, RowSet};
use crate::error::{RepairError, Result};

/// Pragmas for a disposable duplicate that takes one bulk update.
/// Durability and constraint checks are relaxed; the source is never
/// opened with these.
const BULK_UPDATE_PRAGMAS: &str = "
    PRAGMA ignore_check_constraints = ON;
    PRAGMA synchronous = OFF;
    PRAGMA journal_mode = MEMORY;";

/// The Library wraps a media catalog SQLite database.
///
/// A library opened with `open` is read-only: it is the source catalog and
/// must come out of a run byte-for-byte unchanged. Writable handles are only
/// ever opened on a duplicate with `open_for_bulk_update`.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
}

impl Library {
    /// Open an existing catalog read-only.
    pub fn open(db_path: &Path) -> Result<Self> {
        if !db_path.is_file() {
            return Err(RepairError::NotFound(db_path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY,
        )?;

        tracing::debug!(path = %db_path.display(), "catalog opened read-only");

        Ok(Library {
            conn,
            db_path: db_path.to_path_buf(),
        })
    }

    /// Open a duplicated catalog for a single batch of updates.
    pub fn open_for_bulk_update(db_path: &Path) -> Result<Self> {
        if !db_path.is_file() {
            return Err(RepairError::NotFound(db_path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        conn.execute_batch(BULK_UPDATE_PRAGMAS)?;

        Ok(Library {
            conn,
            db_path: db_path.to_path_buf(),
        })
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` against a single transaction and commit once when it returns.
    ///
    /// Failures reported by individual statements inside `f` do not roll
    /// the batch back; only a failed commit surfaces as an error.
    pub fn in_transaction<T>(&mut self, f: impl FnOnce(&dyn CatalogStore) -> T) -> Result<T> {
        let tx = self.conn.transaction()?;
        let out = f(&*tx);
        tx.commit()?;
        Ok(out)
    }
}

impl CatalogStore for Library {
    fn query(&self, spec: &JoinSpec) -> Result<RowSet> {
        CatalogStore::query(&self.conn, spec)
    }

    fn update_timestamp(&self, id: i64, timestamp: i64) -> Result<usize> {
        CatalogStore::update_timestamp(&self.conn, id, timestamp)
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
