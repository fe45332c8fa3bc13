//! Message protocol between the producer handle and the delivery worker.
//!
//! Commands are one-way and fire-and-forget from the producer's view;
//! every command is acknowledged with a [`Reply`] on the return channel.

use courier_core::config::PipelineConfig;
use courier_core::event::Event;

/// Commands accepted by the worker.
#[derive(Debug)]
pub enum Command {
    /// Open the store and start the transport timers.
    Init(Box<PipelineConfig>),
    /// Store one event; critical categories flush immediately.
    Event(Event),
    /// Force one transport flush cycle.
    Flush,
    /// Run the TTL sweep.
    Cleanup,
    /// Release all resources and end the worker task.
    Destroy,
}

/// Which command a reply acknowledges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Init,
    Event,
    Flush,
    Cleanup,
    Destroy,
    /// Out-of-band failure not tied to a single command.
    Error,
}

/// Acknowledgment sent back across the channel.
#[derive(Debug)]
pub struct Reply {
    pub kind: ReplyKind,
    pub success: bool,
    /// Stored event id (event replies) or sweep count (cleanup replies).
    pub id: Option<i64>,
    pub error: Option<String>,
}

impl Reply {
    pub fn ok(kind: ReplyKind) -> Self {
        Self {
            kind,
            success: true,
            id: None,
            error: None,
        }
    }

    pub fn ok_with_id(kind: ReplyKind, id: i64) -> Self {
        Self {
            kind,
            success: true,
            id: Some(id),
            error: None,
        }
    }

    pub fn err(kind: ReplyKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            success: false,
            id: None,
            error: Some(error.into()),
        }
    }
}
