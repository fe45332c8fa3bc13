//! TelemetryPipeline — the producer-side handle.
//!
//! `push` never blocks and never fails; everything risky lives behind the
//! worker channel or the bounded fallback buffer. The delivery mode is
//! decided once: the worker path is probed at construction, and any later
//! channel failure switches to buffer mode permanently. There are no
//! reconnection attempts — flapping between modes would scramble delivery
//! ordering for no durability gain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use courier_core::config::PipelineConfig;
use courier_core::constants;
use courier_core::errors::WorkerError;
use courier_core::event::Event;
use courier_transport::{direct, BeaconSender, EventEnvelope};
use courier_worker::{Command, Reply, ReplyKind};

use crate::buffer::FallbackBuffer;
use crate::degradation::{DegradationEvent, DegradationLog};

/// Delivery mode. The only transition is `Worker` → `Buffer`.
enum Mode {
    /// Durable path: events cross the channel to the delivery worker.
    Worker {
        commands: mpsc::UnboundedSender<Command>,
    },
    /// Degraded path: bounded in-memory buffering, direct best-effort sends.
    Buffer,
}

struct Shared {
    mode: Mutex<Mode>,
    buffer: Mutex<FallbackBuffer>,
    degradations: Mutex<DegradationLog>,
    shutting_down: AtomicBool,
    config: PipelineConfig,
}

/// The producer-facing pipeline handle. Collectors call [`push`]; nothing
/// else of the pipeline is visible to them.
///
/// [`push`]: TelemetryPipeline::push
pub struct TelemetryPipeline {
    shared: Arc<Shared>,
    beacon: BeaconSender,
}

impl TelemetryPipeline {
    /// Start a pipeline. Never fails: when the worker path cannot be
    /// established, the pipeline starts degraded instead.
    pub fn start(config: PipelineConfig) -> Self {
        let beacon = BeaconSender::new(&config.dsn, &config.app_id);
        let shared = Arc::new(Shared {
            mode: Mutex::new(Mode::Buffer),
            buffer: Mutex::new(FallbackBuffer::new(
                config.max_queue_size,
                config.overflow_strategy,
            )),
            degradations: Mutex::new(DegradationLog::default()),
            shutting_down: AtomicBool::new(false),
            config: config.clone(),
        });

        // The worker needs a runtime to live on. Probed exactly once.
        match Handle::try_current() {
            Ok(_) => {
                let handle = courier_worker::spawn();
                if handle
                    .commands
                    .send(Command::Init(Box::new(config)))
                    .is_ok()
                {
                    *lock(&shared.mode) = Mode::Worker {
                        commands: handle.commands,
                    };
                    spawn_reply_watcher(Arc::clone(&shared), handle.replies);
                } else {
                    lock(&shared.degradations).record(
                        "worker",
                        "command channel closed at startup",
                        "memory buffer",
                    );
                }
            }
            Err(e) => {
                lock(&shared.degradations).record(
                    "worker",
                    format!("no async runtime: {e}"),
                    "memory buffer",
                );
            }
        }

        Self { shared, beacon }
    }

    /// Queue one event for delivery. Never blocks and never fails; in the
    /// worst case the event lands in the bounded fallback buffer.
    pub fn push(&self, event: Event) {
        let mut mode = lock(&self.shared.mode);
        let rejected = match &*mode {
            Mode::Worker { commands } => match commands.send(Command::Event(event)) {
                Ok(()) => return,
                Err(mpsc::error::SendError(command)) => command,
            },
            Mode::Buffer => Command::Event(event),
        };
        if !matches!(&*mode, Mode::Buffer) {
            // Worker task is gone; permanent fallback from here on.
            *mode = Mode::Buffer;
            lock(&self.shared.degradations).record(
                "worker",
                WorkerError::ChannelClosed.to_string(),
                "memory buffer",
            );
        }
        drop(mode);
        if let Command::Event(event) = rejected {
            self.buffer_push(event);
        }
    }

    /// Ask for one delivery cycle. Fire-and-forget: worker mode sends a
    /// flush command, buffer mode attempts one direct send off-thread.
    pub fn flush(&self) {
        let mut mode = lock(&self.shared.mode);
        let worker_alive = match &*mode {
            Mode::Worker { commands } => commands.send(Command::Flush).is_ok(),
            Mode::Buffer => false,
        };
        if worker_alive {
            return;
        }
        if !matches!(&*mode, Mode::Buffer) {
            *mode = Mode::Buffer;
            lock(&self.shared.degradations).record(
                "worker",
                WorkerError::ChannelClosed.to_string(),
                "memory buffer",
            );
        }
        drop(mode);
        self.flush_buffer(true);
    }

    /// Graceful teardown: flush, release the worker, clear the buffer.
    /// The buffer is cleared unconditionally — durability only ever exists
    /// inside the worker's store.
    pub fn shutdown(self) {
        self.shared.shutting_down.store(true, Ordering::Release);
        let mut mode = lock(&self.shared.mode);
        match std::mem::replace(&mut *mode, Mode::Buffer) {
            Mode::Worker { commands } => {
                let _ = commands.send(Command::Flush);
                let _ = commands.send(Command::Destroy);
            }
            Mode::Buffer => {
                drop(mode);
                // Last chance for buffered events; failure is accepted loss.
                self.flush_buffer(false);
            }
        }
        lock(&self.shared.buffer).clear();
    }

    /// Best-effort final send while the host application tears down.
    /// Buffer mode beacons whatever is queued; worker mode falls back to
    /// flush-then-destroy, the closest the durable path has to a beacon.
    /// Returns whether the attempt was handed off.
    pub fn unload(self) -> bool {
        self.shared.shutting_down.store(true, Ordering::Release);
        let mut mode = lock(&self.shared.mode);
        match std::mem::replace(&mut *mode, Mode::Buffer) {
            Mode::Worker { commands } => {
                let flushed = commands.send(Command::Flush).is_ok();
                let _ = commands.send(Command::Destroy);
                flushed
            }
            Mode::Buffer => {
                drop(mode);
                let pending = lock(&self.shared.buffer).drain_all();
                self.beacon.send(pending)
            }
        }
    }

    /// True once the pipeline has permanently fallen back to buffering.
    pub fn is_degraded(&self) -> bool {
        lock(&self.shared.degradations).is_degraded()
    }

    /// Fallback decisions taken so far.
    pub fn degradations(&self) -> Vec<DegradationEvent> {
        lock(&self.shared.degradations).events().to_vec()
    }

    /// Number of events currently held in the fallback buffer.
    pub fn buffered_len(&self) -> usize {
        lock(&self.shared.buffer).len()
    }

    fn buffer_push(&self, event: Event) {
        let accepted = lock(&self.shared.buffer).push(event);
        if !accepted {
            tracing::debug!("fallback buffer full, event dropped");
        }
    }

    /// One direct send of up to `batch_size` buffered events on a detached
    /// thread. Events leave the buffer up front; with `restore_on_failure`
    /// they come back if the send fails.
    fn flush_buffer(&self, restore_on_failure: bool) {
        let batch = lock(&self.shared.buffer).drain_front(self.shared.config.batch_size);
        if batch.is_empty() {
            return;
        }
        let restore = batch.clone();
        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("courier-direct-flush".to_string())
            .spawn(move || {
                let envelope = EventEnvelope::batch(&shared.config.app_id, batch);
                let timeout = Duration::from_millis(constants::REQUEST_TIMEOUT_MS);
                match direct::post_envelope_blocking(&shared.config.dsn, &envelope, timeout) {
                    Ok(()) => {
                        tracing::debug!(sent = envelope.events.len(), "direct flush delivered");
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "direct flush failed");
                        if restore_on_failure {
                            lock(&shared.buffer).restore_front(envelope.events);
                        }
                    }
                }
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "could not spawn direct flush thread");
            if restore_on_failure {
                lock(&self.shared.buffer).restore_front(restore);
            }
        }
    }
}

/// Watch worker replies: a failed init or a dead channel flips the
/// pipeline into buffer mode, permanently.
fn spawn_reply_watcher(shared: Arc<Shared>, mut replies: mpsc::UnboundedReceiver<Reply>) {
    tokio::spawn(async move {
        while let Some(reply) = replies.recv().await {
            if reply.success {
                continue;
            }
            match reply.kind {
                ReplyKind::Init => {
                    let error = reply.error.unwrap_or_else(|| "unknown".to_string());
                    degrade(&shared, format!("worker init failed: {error}"));
                }
                kind => {
                    tracing::debug!(
                        kind = ?kind,
                        error = reply.error.as_deref().unwrap_or("unknown"),
                        "worker command failed"
                    );
                }
            }
        }
        if !shared.shutting_down.load(Ordering::Acquire) {
            degrade(&shared, "worker task ended unexpectedly".to_string());
        }
    });
}

/// Permanent switch to buffer mode. Idempotent, never reversed. The
/// orphaned worker, if still reachable, is told to destroy itself.
fn degrade(shared: &Arc<Shared>, failure: String) {
    let mut mode = lock(&shared.mode);
    if matches!(&*mode, Mode::Buffer) {
        return;
    }
    let previous = std::mem::replace(&mut *mode, Mode::Buffer);
    if let Mode::Worker { commands } = previous {
        let _ = commands.send(Command::Destroy);
    }
    lock(&shared.degradations).record("worker", failure, "memory buffer");
}

/// Lock that survives poisoning: a panicked holder must not take the
/// producer path down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
