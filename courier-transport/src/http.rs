//! Async HTTP client for the collector endpoint.

use std::time::Duration;

use reqwest::header;
use serde::Serialize;

use courier_core::constants;
use courier_core::errors::{CourierError, CourierResult, TransportError};

use crate::compress;
use crate::protocol::EventEnvelope;

/// Client settings for the batch path.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Collector endpoint.
    pub dsn: String,
    /// Gzip request bodies.
    pub enable_compression: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            enable_compression: false,
            timeout: Duration::from_millis(constants::REQUEST_TIMEOUT_MS),
        }
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }
}

/// Thin wrapper over reqwest pointed at the collector DSN.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> CourierResult<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                CourierError::Transport(TransportError::Network {
                    reason: e.to_string(),
                })
            })?;
        Ok(Self { inner, config })
    }

    /// POST one envelope. Success is any 2xx status; anything else is a
    /// transport failure subject to retry.
    pub async fn post_envelope<T: Serialize>(
        &self,
        envelope: &EventEnvelope<T>,
    ) -> CourierResult<()> {
        let body = serde_json::to_vec(envelope)?;
        let request = self
            .inner
            .post(&self.config.dsn)
            .header(header::CONTENT_TYPE, "application/json");

        let request = if self.config.enable_compression {
            match compress::gzip(&body) {
                Ok(compressed) => request
                    .header(header::CONTENT_ENCODING, "gzip")
                    .body(compressed),
                Err(e) => {
                    // Plain fallback: a batch beats a perfect batch.
                    tracing::debug!(error = %e, "gzip encoding failed, sending plain body");
                    request.body(body)
                }
            }
        } else {
            request.body(body)
        };

        let response = request.send().await.map_err(|e| TransportError::Network {
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
}
