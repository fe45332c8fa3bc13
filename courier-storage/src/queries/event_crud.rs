//! Insert, ordered batch read, and acknowledged delete for stored events.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use courier_core::errors::{CourierError, CourierResult, StorageError};
use courier_core::event::{Event, EventCategory, StoredEvent};

use crate::to_storage_err;

/// Insert a single event with its expiry. Returns the assigned id.
pub fn insert_event(
    conn: &Connection,
    event: &Event,
    expire_at: DateTime<Utc>,
) -> CourierResult<i64> {
    let data_json = serde_json::to_string(&event.data).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO events (category, timestamp, data, expire_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            event.category.as_str(),
            event.timestamp.to_rfc3339(),
            data_json,
            expire_at.timestamp_millis(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

/// Read up to `limit` events in insertion (id) order.
pub fn get_batch(conn: &Connection, limit: usize) -> CourierResult<Vec<StoredEvent>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, category, timestamp, data, expire_at
             FROM events ORDER BY id LIMIT ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mapped = stmt
        .query_map(params![limit as i64], |row| Ok(row_to_stored_event(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut events = Vec::new();
    for item in mapped {
        events.push(item.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(events)
}

/// Delete events by id after a delivery acknowledgment. Idempotent: absent
/// and duplicate ids are no-ops, and a failure on one id is logged without
/// aborting the deletion of the remaining ids. Returns the number removed.
pub fn delete_events(conn: &Connection, ids: &[i64]) -> CourierResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("delete_events begin: {e}")))?;

    let mut deleted = 0usize;
    {
        let mut stmt = tx
            .prepare("DELETE FROM events WHERE id = ?1")
            .map_err(|e| to_storage_err(e.to_string()))?;
        for id in ids {
            match stmt.execute(params![id]) {
                Ok(n) => deleted += n,
                Err(e) => {
                    tracing::warn!(event_id = id, error = %e, "failed to delete delivered event");
                }
            }
        }
    }

    tx.commit()
        .map_err(|e| to_storage_err(format!("delete_events commit: {e}")))?;
    Ok(deleted)
}

/// Parse a row from the events table into a [`StoredEvent`].
fn row_to_stored_event(row: &rusqlite::Row<'_>) -> CourierResult<StoredEvent> {
    let id: i64 = row.get(0).map_err(|e| to_storage_err(e.to_string()))?;
    let category_str: String = row.get(1).map_err(|e| to_storage_err(e.to_string()))?;
    let timestamp_str: String = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
    let data_json: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    let expire_ms: i64 = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;

    let category = EventCategory::parse(&category_str).ok_or_else(|| {
        CourierError::Storage(StorageError::UnknownCategory {
            name: category_str.clone(),
        })
    })?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CourierError::Storage(StorageError::CorruptRecord {
                id,
                details: format!("timestamp '{timestamp_str}': {e}"),
            })
        })?;
    let data = serde_json::from_str(&data_json).map_err(|e| {
        CourierError::Storage(StorageError::CorruptRecord {
            id,
            details: format!("data payload: {e}"),
        })
    })?;
    let expire_at = DateTime::from_timestamp_millis(expire_ms).ok_or_else(|| {
        CourierError::Storage(StorageError::CorruptRecord {
            id,
            details: format!("expire_at {expire_ms} out of range"),
        })
    })?;

    Ok(StoredEvent {
        id,
        category,
        timestamp,
        data,
        expire_at,
    })
}
