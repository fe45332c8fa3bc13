//! # courier-transport
//!
//! Network delivery for the pipeline: wire envelopes, the batching HTTP
//! sender with exponential-backoff retry, the synchronous direct-send path
//! for degraded mode, and the fire-and-forget unload beacon.

pub mod backoff;
pub mod beacon;
pub mod compress;
pub mod direct;
pub mod http;
pub mod protocol;
pub mod sender;

pub use backoff::Backoff;
pub use beacon::BeaconSender;
pub use http::{HttpClient, HttpClientConfig};
pub use protocol::EventEnvelope;
pub use sender::{BatchSender, SenderConfig, SenderState};
