/// Delivery worker protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker already initialized")]
    AlreadyInitialized,

    #[error("worker not initialized")]
    NotInitialized,

    #[error("worker channel closed")]
    ChannelClosed,
}
