//! Fire-and-forget unload transport.
//!
//! One best-effort POST while the host application is tearing down. The
//! send runs on a detached OS thread with a hard timeout, so it needs no
//! async runtime and never holds teardown hostage. The returned boolean
//! reports handoff, not delivery — by the time the request would resolve
//! there is nobody left to retry, so `false` is never retried.

use std::time::Duration;

use serde::Serialize;

use courier_core::constants;

use crate::direct;
use crate::protocol::EventEnvelope;

/// Best-effort sender for page/process teardown.
#[derive(Debug, Clone)]
pub struct BeaconSender {
    dsn: String,
    app_id: String,
}

impl BeaconSender {
    pub fn new(dsn: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            app_id: app_id.into(),
        }
    }

    /// Hand off whatever is pending. Returns true when the attempt was
    /// dispatched; the outcome of the request itself is unobservable.
    pub fn send<T: Serialize + Send + 'static>(&self, events: Vec<T>) -> bool {
        if events.is_empty() {
            return true;
        }
        let envelope = EventEnvelope::beacon(&self.app_id, events);
        let dsn = self.dsn.clone();

        std::thread::Builder::new()
            .name("courier-beacon".to_string())
            .spawn(move || {
                let timeout = Duration::from_millis(constants::BEACON_TIMEOUT_MS);
                if let Err(e) = direct::post_envelope_blocking(&dsn, &envelope, timeout) {
                    tracing::debug!(error = %e, "beacon send failed");
                }
            })
            .is_ok()
    }
}
