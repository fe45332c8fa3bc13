/// Transport-layer errors for batch delivery.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("collector rejected batch: HTTP {status}")]
    Rejected { status: u16 },

    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}
