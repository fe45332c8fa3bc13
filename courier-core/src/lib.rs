//! # courier-core
//!
//! Foundation crate for the Courier telemetry pipeline.
//! Defines event types, configuration, errors, constants, and the traits
//! at the storage/transport seam. Every other crate in the workspace
//! depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod event;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::{OverflowStrategy, PipelineConfig};
pub use errors::{CourierError, CourierResult};
pub use event::{Event, EventCategory, StoredEvent};
pub use traits::BatchSource;
