//! TTL sweep and database upkeep.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use courier_core::errors::CourierResult;

use crate::to_storage_err;

/// Delete every event whose expiry is at or before `cutoff`. Rides the
/// `expire_at` index, so cost tracks the number of expired rows rather
/// than the store size. Returns the count deleted.
pub fn expired_cleanup(conn: &Connection, cutoff: DateTime<Utc>) -> CourierResult<usize> {
    conn.execute(
        "DELETE FROM events WHERE expire_at <= ?1",
        params![cutoff.timestamp_millis()],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Total undelivered events.
pub fn event_count(conn: &Connection) -> CourierResult<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as usize)
}

/// WAL checkpoint, run on close.
pub fn wal_checkpoint(conn: &Connection) -> CourierResult<()> {
    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Run integrity check. Returns true if the database is OK.
pub fn integrity_check(conn: &Connection) -> CourierResult<bool> {
    let result: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(result == "ok")
}
