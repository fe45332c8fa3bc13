//! Synchronous direct send, used by the degraded producer path where no
//! worker (and possibly no async runtime) exists. Callers run this on a
//! detached thread; it must never be invoked from an async context.

use std::time::Duration;

use serde::Serialize;

use courier_core::errors::{CourierResult, TransportError};

use crate::protocol::EventEnvelope;

/// POST one envelope with a blocking client and a hard timeout.
pub fn post_envelope_blocking<T: Serialize>(
    dsn: &str,
    envelope: &EventEnvelope<T>,
    timeout: Duration,
) -> CourierResult<()> {
    let body = serde_json::to_vec(envelope)?;
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TransportError::Network {
            reason: e.to_string(),
        })?;

    let response = client
        .post(dsn)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .map_err(|e| TransportError::Network {
            reason: e.to_string(),
        })?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Rejected {
            status: status.as_u16(),
        }
        .into())
    }
}
