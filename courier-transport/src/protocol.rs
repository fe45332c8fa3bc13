//! Wire protocol for batch delivery — camelCase JSON with a request id
//! for tracing a batch through the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use courier_core::constants;

/// Marker recorded on envelopes sent through the unload path.
pub const SENT_BY_BEACON: &str = "beacon";

/// One request body per delivery chunk.
///
/// Generic over the event representation: the batch path ships
/// [`StoredEvent`](courier_core::event::StoredEvent)s, the degraded and
/// unload paths ship bare [`Event`](courier_core::event::Event)s that
/// never reached a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<T: Serialize> {
    pub app_id: String,
    /// SDK version, for collector-side compatibility decisions.
    pub sdk_version: String,
    /// Send time, distinct from each event's capture time.
    pub timestamp: DateTime<Utc>,
    /// Unique id for tracing this request.
    pub request_id: String,
    pub events: Vec<T>,
    /// Present only on unload sends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_by: Option<String>,
}

impl<T: Serialize> EventEnvelope<T> {
    /// Envelope for the regular batch path.
    pub fn batch(app_id: &str, events: Vec<T>) -> Self {
        Self {
            app_id: app_id.to_string(),
            sdk_version: constants::VERSION.to_string(),
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            events,
            sent_by: None,
        }
    }

    /// Envelope for the fire-and-forget unload path.
    pub fn beacon(app_id: &str, events: Vec<T>) -> Self {
        Self {
            sent_by: Some(SENT_BY_BEACON.to_string()),
            ..Self::batch(app_id, events)
        }
    }
}
