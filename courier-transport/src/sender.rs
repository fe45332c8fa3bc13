//! BatchSender — pulls stored events, ships them in sequential chunks,
//! retries with exponential backoff, and acknowledges on full success only.
//!
//! One flush cycle may be in flight at a time: the `Idle → Sending → Idle`
//! transition is a compare-and-swap, so a timer tick racing an explicit
//! flush collapses into a single cycle. `Stopped` is terminal and only
//! suppresses *future* cycles; an in-flight request completes or fails on
//! its own.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use courier_core::errors::{CourierResult, TransportError};
use courier_core::event::StoredEvent;
use courier_core::traits::BatchSource;

use crate::backoff::Backoff;
use crate::http::HttpClient;
use crate::protocol::EventEnvelope;

const STATE_IDLE: u8 = 0;
const STATE_SENDING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Delivery state of a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Idle,
    Sending,
    Stopped,
}

impl SenderState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            STATE_SENDING => Self::Sending,
            STATE_STOPPED => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

/// Tuning for one sender.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Application identifier stamped on every envelope.
    pub app_id: String,
    /// Events per request chunk.
    pub batch_size: usize,
    /// Consecutive failures tolerated before the attempt is abandoned.
    pub max_retries: u32,
    /// Backoff schedule between consecutive failures.
    pub backoff: Backoff,
    /// Hard cap on events pulled per flush cycle.
    pub max_pull: usize,
}

/// The batch transport. Cheap to clone; clones share one state machine.
#[derive(Clone)]
pub struct BatchSender {
    inner: Arc<SenderInner>,
}

struct SenderInner {
    client: HttpClient,
    source: Arc<dyn BatchSource>,
    config: SenderConfig,
    state: AtomicU8,
}

impl BatchSender {
    pub fn new(client: HttpClient, source: Arc<dyn BatchSource>, config: SenderConfig) -> Self {
        Self {
            inner: Arc::new(SenderInner {
                client,
                source,
                config,
                state: AtomicU8::new(STATE_IDLE),
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> SenderState {
        SenderState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Start one flush cycle in the background unless a cycle is already
    /// in flight or the sender is stopped. Returns true when started.
    pub fn try_flush(&self) -> bool {
        if !self.inner.begin() {
            return false;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(e) = inner.run_flush().await {
                tracing::warn!(error = %e, "flush cycle failed; events remain stored");
            }
            inner.finish();
        });
        true
    }

    /// Run one flush cycle inline. Returns Ok(false) when a cycle was
    /// already in flight (or the sender is stopped) and nothing was done.
    pub async fn flush_now(&self) -> CourierResult<bool> {
        if !self.inner.begin() {
            return Ok(false);
        }
        let result = self.inner.run_flush().await;
        self.inner.finish();
        result.map(|_| true)
    }

    /// Prevent any further flush cycles.
    pub fn stop(&self) {
        self.inner.state.store(STATE_STOPPED, Ordering::Release);
    }
}

impl SenderInner {
    /// Idle → Sending, or refuse.
    fn begin(&self) -> bool {
        self.state
            .compare_exchange(STATE_IDLE, STATE_SENDING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Sending → Idle. A `stop()` that raced the cycle wins and the state
    /// stays Stopped.
    fn finish(&self) {
        let _ = self.state.compare_exchange(
            STATE_SENDING,
            STATE_IDLE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// One flush cycle: pull once, then retry delivery of that same pull
    /// until it fully succeeds or the retry budget runs out.
    async fn run_flush(&self) -> CourierResult<()> {
        let events = self.source.fetch_batch(self.config.max_pull)?;
        if events.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = events.iter().map(|e| e.id).collect();

        let mut retries = 0u32;
        loop {
            match self.send_chunks(&events).await {
                Ok(()) => {
                    let removed = self.source.ack_delivered(&ids)?;
                    tracing::debug!(delivered = events.len(), removed, "batch delivered");
                    return Ok(());
                }
                Err(e) => {
                    retries += 1;
                    if retries >= self.config.max_retries {
                        tracing::warn!(
                            error = %e,
                            attempts = retries,
                            "abandoning flush attempt; events stay stored for the next cycle"
                        );
                        return Err(TransportError::RetriesExhausted { attempts: retries }.into());
                    }
                    let delay = self.config.backoff.delay(retries - 1);
                    tracing::debug!(
                        error = %e,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "flush failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Send the pulled events as sequential `batch_size` chunks. Chunks are
    /// never concurrent, so at most one request is outstanding; any chunk
    /// failure fails the whole attempt and nothing is acknowledged.
    async fn send_chunks(&self, events: &[StoredEvent]) -> CourierResult<()> {
        for chunk in events.chunks(self.config.batch_size.max(1)) {
            let envelope = EventEnvelope::batch(&self.config.app_id, chunk.to_vec());
            self.client.post_envelope(&envelope).await?;
        }
        Ok(())
    }
}
