//! Error types for every Courier subsystem.

mod storage_error;
mod transport_error;
mod worker_error;

pub use storage_error::StorageError;
pub use transport_error::TransportError;
pub use worker_error::WorkerError;

/// Convenience alias used across the workspace.
pub type CourierResult<T> = Result<T, CourierError>;

/// Top-level error aggregating every subsystem.
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
