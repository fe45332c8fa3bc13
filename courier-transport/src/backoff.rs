//! Exponential backoff schedule for failed flush attempts.

use std::time::Duration;

/// Computes `min(base * 2^retries, cap)`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
}

impl Backoff {
    pub fn new(base_ms: u64, cap_ms: u64) -> Self {
        Self {
            base: Duration::from_millis(base_ms),
            cap: Duration::from_millis(cap_ms),
        }
    }

    /// Delay before retry number `retries` (0-based).
    pub fn delay(&self, retries: u32) -> Duration {
        // Shifts past 2^20 would exceed any sane cap anyway.
        let factor = 1u64 << retries.min(20);
        self.cap.min(self.base.saturating_mul(factor as u32))
    }
}
