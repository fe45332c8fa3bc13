//! v001 — events table with expiry and diagnostic indexes.
//!
//! `expire_at` is unix epoch milliseconds so the sweep's upper-bound range
//! scan compares integers; `timestamp` stays RFC 3339 for inspectability.

use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS events (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            category    TEXT NOT NULL,
            timestamp   TEXT NOT NULL,
            data        TEXT NOT NULL,
            expire_at   INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_expire_at ON events(expire_at);
        CREATE INDEX IF NOT EXISTS idx_events_category_timestamp ON events(category, timestamp);
        ",
    )
}
