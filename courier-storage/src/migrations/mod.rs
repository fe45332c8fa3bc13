//! Schema migrations tracked via `PRAGMA user_version`.

mod v001_events_table;

use rusqlite::Connection;

use courier_core::errors::{CourierError, CourierResult, StorageError};

use crate::to_storage_err;

/// Latest schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Run all pending migrations on the given connection.
pub fn run_migrations(conn: &Connection) -> CourierResult<()> {
    let current: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let current = current as u32;

    if current < 1 {
        v001_events_table::apply(conn).map_err(|e| {
            CourierError::Storage(StorageError::MigrationFailed {
                version: 1,
                reason: e.to_string(),
            })
        })?;
    }

    if current < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION as i64)
            .map_err(|e| to_storage_err(e.to_string()))?;
        tracing::debug!(from = current, to = SCHEMA_VERSION, "schema migrated");
    }
    Ok(())
}
