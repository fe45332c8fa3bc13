//! # courier-client
//!
//! The producer-facing surface: a non-blocking handle that forwards
//! events to the delivery worker and degrades, once and permanently, to a
//! bounded in-memory buffer when the durable path is unavailable.

pub mod buffer;
pub mod degradation;
pub mod pipeline;

pub use buffer::FallbackBuffer;
pub use degradation::{DegradationEvent, DegradationLog};
pub use pipeline::TelemetryPipeline;
