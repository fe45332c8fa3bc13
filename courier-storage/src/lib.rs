//! # courier-storage
//!
//! SQLite persistence for undelivered telemetry events: schema migrations,
//! insertion with expiry, ordered batch reads, acknowledged deletes, and
//! the TTL sweep.

pub mod connection;
pub mod engine;
pub mod migrations;
pub mod pragmas;
pub mod queries;

pub use engine::EventStore;

use courier_core::errors::{CourierError, StorageError};

/// Map a sqlite-layer failure into a [`StorageError`].
pub(crate) fn to_storage_err(message: String) -> CourierError {
    CourierError::Storage(StorageError::Sqlite { message })
}
