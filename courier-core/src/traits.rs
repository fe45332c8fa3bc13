//! Traits at the storage/transport seam.

use crate::errors::CourierResult;
use crate::event::StoredEvent;

/// Source of deliverable events for the batch transport.
///
/// Implemented by the persistent store and injected into the sender, so
/// the transport reads and acknowledges records it never owns. Fetching
/// does not remove anything; only [`BatchSource::ack_delivered`] does,
/// and only after a positive delivery acknowledgment.
pub trait BatchSource: Send + Sync {
    /// Pull up to `limit` stored events in insertion order.
    fn fetch_batch(&self, limit: usize) -> CourierResult<Vec<StoredEvent>>;

    /// Remove delivered events. Returns the number actually removed;
    /// absent or duplicate ids are not an error.
    fn ack_delivered(&self, ids: &[i64]) -> CourierResult<usize>;
}
