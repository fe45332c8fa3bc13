//! EventStore — owns the write connection, runs migrations on open, and
//! implements [`BatchSource`] for the transport.

use std::path::Path;

use chrono::{DateTime, Utc};

use courier_core::errors::CourierResult;
use courier_core::event::{Event, StoredEvent};
use courier_core::traits::BatchSource;

use crate::connection::WriteConnection;
use crate::migrations;
use crate::queries;

/// The persistent event store. One logical database per pipeline; the
/// delivery worker is its only writer.
pub struct EventStore {
    conn: WriteConnection,
}

impl EventStore {
    /// Open a store backed by a file on disk.
    pub fn open(path: &Path) -> CourierResult<Self> {
        let conn = WriteConnection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> CourierResult<Self> {
        let conn = WriteConnection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> CourierResult<()> {
        self.conn.with_conn(|conn| {
            migrations::run_migrations(conn)?;
            if !crate::pragmas::verify_wal_mode(conn)? {
                // In-memory databases report "memory"; files should be WAL.
                tracing::debug!("journal_mode is not WAL");
            }
            Ok(())
        })
    }

    /// Insert an event with its expiry. Returns the assigned id, which is
    /// monotonically increasing and never reused.
    pub fn add(&self, event: &Event, expire_at: DateTime<Utc>) -> CourierResult<i64> {
        self.conn
            .with_conn(|conn| queries::event_crud::insert_event(conn, event, expire_at))
    }

    /// Read up to `limit` events in insertion order. Never returns a
    /// record that has been deleted.
    pub fn get_batch(&self, limit: usize) -> CourierResult<Vec<StoredEvent>> {
        self.conn
            .with_conn(|conn| queries::event_crud::get_batch(conn, limit))
    }

    /// Delete events by id. Idempotent; returns the number removed.
    pub fn delete(&self, ids: &[i64]) -> CourierResult<usize> {
        self.conn
            .with_conn(|conn| queries::event_crud::delete_events(conn, ids))
    }

    /// Remove every record whose expiry is at or before `now`.
    pub fn cleanup(&self, now: DateTime<Utc>) -> CourierResult<usize> {
        self.conn
            .with_conn(|conn| queries::maintenance::expired_cleanup(conn, now))
    }

    /// Total undelivered events.
    pub fn count(&self) -> CourierResult<usize> {
        self.conn.with_conn(queries::maintenance::event_count)
    }

    /// Run an integrity check. Returns true if the database is OK.
    pub fn integrity_check(&self) -> CourierResult<bool> {
        self.conn.with_conn(queries::maintenance::integrity_check)
    }

    /// Checkpoint the WAL before the store handle is released. The sqlite
    /// connection itself closes when the last handle drops, so an
    /// in-flight flush keeps its read view until it finishes.
    pub fn close(&self) -> CourierResult<()> {
        self.conn.with_conn(queries::maintenance::wal_checkpoint)
    }
}

impl BatchSource for EventStore {
    fn fetch_batch(&self, limit: usize) -> CourierResult<Vec<StoredEvent>> {
        self.get_batch(limit)
    }

    fn ack_delivered(&self, ids: &[i64]) -> CourierResult<usize> {
        self.delete(ids)
    }
}
