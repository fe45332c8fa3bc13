//! The delivery worker task.
//!
//! Owns the [`EventStore`] and [`BatchSender`]; handles the command
//! protocol and drives the periodic flush and TTL-sweep cadences. Any
//! error during command handling is caught and reported as an error
//! reply; nothing propagates to, or can crash, the producer's thread.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use courier_core::config::PipelineConfig;
use courier_core::constants;
use courier_core::errors::{CourierResult, WorkerError};
use courier_core::event::Event;
use courier_core::traits::BatchSource;
use courier_storage::EventStore;
use courier_transport::{Backoff, BatchSender, HttpClient, HttpClientConfig, SenderConfig};

use crate::protocol::{Command, Reply, ReplyKind};

/// Handle to a spawned worker: the command sender, the reply receiver,
/// and the task itself.
pub struct WorkerHandle {
    pub commands: mpsc::UnboundedSender<Command>,
    pub replies: mpsc::UnboundedReceiver<Reply>,
    pub task: tokio::task::JoinHandle<()>,
}

/// Spawn the delivery worker. Must be called from within a Tokio runtime;
/// the caller decides what to do when none exists.
pub fn spawn() -> WorkerHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(command_rx, reply_tx));
    WorkerHandle {
        commands: command_tx,
        replies: reply_rx,
        task,
    }
}

/// Worker state once `Init` has opened the store.
struct Active {
    store: Arc<EventStore>,
    sender: BatchSender,
    config: PipelineConfig,
}

impl Active {
    fn open(config: PipelineConfig) -> CourierResult<Self> {
        let store = match &config.db_path {
            Some(path) => EventStore::open(path)?,
            None => EventStore::open_in_memory()?,
        };
        if let Ok(pending) = store.count() {
            if pending > 0 {
                tracing::info!(pending, "undelivered events from a previous session");
            }
        }
        let store = Arc::new(store);

        let client = HttpClient::new(
            HttpClientConfig::new(&config.dsn).with_compression(config.enable_compression),
        )?;
        let sender = BatchSender::new(
            client,
            Arc::clone(&store) as Arc<dyn BatchSource>,
            SenderConfig {
                app_id: config.app_id.clone(),
                batch_size: config.batch_size,
                max_retries: config.max_retries,
                backoff: Backoff::new(config.backoff_base_ms, config.backoff_cap_ms),
                max_pull: constants::MAX_PULL_SIZE,
            },
        );

        Ok(Self {
            store,
            sender,
            config,
        })
    }

    /// Insert one event with its category's retention window.
    fn store_event(&self, event: &Event) -> CourierResult<i64> {
        let ttl = self.config.retention_secs(event.category);
        let expire_at = Utc::now() + chrono::Duration::seconds(ttl as i64);
        self.store.add(event, expire_at)
    }

    fn shutdown(self) {
        self.sender.stop();
        if let Err(e) = self.store.close() {
            tracing::warn!(error = %e, "store close failed");
        }
    }
}

async fn run(
    mut commands: mpsc::UnboundedReceiver<Command>,
    replies: mpsc::UnboundedSender<Reply>,
) {
    let mut active: Option<Active> = None;

    // Placeholder cadence until `Init` provides the real intervals.
    let mut flush_tick = periodic(Duration::from_secs(3_600));
    let mut sweep_tick = periodic(Duration::from_secs(3_600));

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    // Producer handle dropped without Destroy.
                    if let Some(active) = active.take() {
                        active.shutdown();
                    }
                    break;
                };
                match command {
                    Command::Init(config) => {
                        if active.is_some() {
                            reply(&replies, Reply::err(
                                ReplyKind::Init,
                                WorkerError::AlreadyInitialized.to_string(),
                            ));
                            continue;
                        }
                        match Active::open(*config) {
                            Ok(opened) => {
                                flush_tick = periodic(Duration::from_secs(
                                    opened.config.flush_interval_secs.max(1),
                                ));
                                sweep_tick = periodic(Duration::from_secs(
                                    opened.config.cleanup_interval_secs.max(1),
                                ));
                                tracing::info!(
                                    app_id = %opened.config.app_id,
                                    "delivery worker initialized"
                                );
                                active = Some(opened);
                                reply(&replies, Reply::ok(ReplyKind::Init));
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "worker init failed");
                                reply(&replies, Reply::err(ReplyKind::Init, e.to_string()));
                            }
                        }
                    }
                    Command::Event(event) => match &active {
                        Some(active) => match active.store_event(&event) {
                            Ok(id) => {
                                reply(&replies, Reply::ok_with_id(ReplyKind::Event, id));
                                if event.category.is_critical() {
                                    // Critical events must not wait for the timer.
                                    active.sender.try_flush();
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, category = event.category.as_str(),
                                    "failed to store event");
                                reply(&replies, Reply::err(ReplyKind::Event, e.to_string()));
                            }
                        },
                        None => reply(&replies, Reply::err(
                            ReplyKind::Event,
                            WorkerError::NotInitialized.to_string(),
                        )),
                    },
                    Command::Flush => match &active {
                        Some(active) => match active.sender.flush_now().await {
                            Ok(_ran) => reply(&replies, Reply::ok(ReplyKind::Flush)),
                            Err(e) => reply(&replies, Reply::err(ReplyKind::Flush, e.to_string())),
                        },
                        None => reply(&replies, Reply::err(
                            ReplyKind::Flush,
                            WorkerError::NotInitialized.to_string(),
                        )),
                    },
                    Command::Cleanup => match &active {
                        Some(active) => match active.store.cleanup(Utc::now()) {
                            Ok(deleted) => {
                                reply(&replies, Reply::ok_with_id(ReplyKind::Cleanup, deleted as i64));
                            }
                            Err(e) => reply(&replies, Reply::err(ReplyKind::Cleanup, e.to_string())),
                        },
                        None => reply(&replies, Reply::err(
                            ReplyKind::Cleanup,
                            WorkerError::NotInitialized.to_string(),
                        )),
                    },
                    Command::Destroy => {
                        if let Some(active) = active.take() {
                            active.shutdown();
                        }
                        reply(&replies, Reply::ok(ReplyKind::Destroy));
                        break;
                    }
                }
            }
            _ = flush_tick.tick() => {
                if let Some(active) = &active {
                    active.sender.try_flush();
                }
            }
            _ = sweep_tick.tick() => {
                if let Some(active) = &active {
                    match active.store.cleanup(Utc::now()) {
                        Ok(0) => {}
                        Ok(deleted) => tracing::debug!(deleted, "expired events swept"),
                        Err(e) => {
                            tracing::warn!(error = %e, "ttl sweep failed");
                            reply(&replies, Reply::err(ReplyKind::Error, e.to_string()));
                        }
                    }
                }
            }
        }
    }
    tracing::debug!("delivery worker stopped");
}

/// An interval whose first tick fires one full period from now, not
/// immediately.
fn periodic(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

fn reply(replies: &mpsc::UnboundedSender<Reply>, message: Reply) {
    if replies.send(message).is_err() {
        tracing::debug!("reply channel closed; producer side is gone");
    }
}
