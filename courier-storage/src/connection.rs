//! The single write connection.
//!
//! The delivery worker is the store's only owner, so one mutex-guarded
//! connection replaces a pool: no external writers exist by construction.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use courier_core::errors::CourierResult;

use crate::pragmas::apply_pragmas;
use crate::to_storage_err;

/// Mutex-guarded owner of the sqlite connection.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> CourierResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> CourierResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a closure with the connection.
    pub fn with_conn<F, T>(&self, f: F) -> CourierResult<T>
    where
        F: FnOnce(&Connection) -> CourierResult<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| to_storage_err(format!("write connection lock poisoned: {e}")))?;
        f(&guard)
    }
}
