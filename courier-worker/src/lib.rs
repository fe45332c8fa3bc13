//! # courier-worker
//!
//! The delivery worker: an isolated task owning the persistent store and
//! the batch transport. It is the only component that touches disk and
//! network, fed commands over an unbounded channel so the producer side
//! never blocks.

pub mod protocol;
pub mod worker;

pub use protocol::{Command, Reply, ReplyKind};
pub use worker::{spawn, WorkerHandle};
