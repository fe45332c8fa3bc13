//! Bounded in-memory fallback buffer.
//!
//! Holds events when no worker channel exists. Not durable: contents are
//! lost with the process, which is the documented cost of degraded mode.

use std::collections::VecDeque;

use courier_core::config::OverflowStrategy;
use courier_core::event::Event;

/// FIFO event buffer bounded by `max_size`.
#[derive(Debug)]
pub struct FallbackBuffer {
    events: VecDeque<Event>,
    max_size: usize,
    strategy: OverflowStrategy,
}

impl FallbackBuffer {
    pub fn new(max_size: usize, strategy: OverflowStrategy) -> Self {
        Self {
            events: VecDeque::with_capacity(max_size.min(1_024)),
            max_size,
            strategy,
        }
    }

    /// Append one event, applying the overflow policy when full.
    /// Returns false when the event was discarded (`Drop` policy).
    pub fn push(&mut self, event: Event) -> bool {
        if self.events.len() >= self.max_size {
            match self.strategy {
                OverflowStrategy::Replace => {
                    self.events.pop_front();
                }
                OverflowStrategy::Drop => return false,
            }
        }
        self.events.push_back(event);
        true
    }

    /// Remove and return up to `limit` events from the front (oldest first).
    pub fn drain_front(&mut self, limit: usize) -> Vec<Event> {
        let take = limit.min(self.events.len());
        self.events.drain(..take).collect()
    }

    /// Remove and return everything, oldest first.
    pub fn drain_all(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// Put unsent events back at the front, preserving their order.
    /// When that would overflow, the oldest of the restored events are
    /// dropped first: the buffer keeps favoring recency.
    pub fn restore_front(&mut self, events: Vec<Event>) {
        let mut dropped = 0usize;
        for event in events.into_iter().rev() {
            if self.events.len() >= self.max_size {
                dropped += 1;
                continue;
            }
            self.events.push_front(event);
        }
        if dropped > 0 {
            tracing::debug!(dropped, "buffer full, oldest unsent events dropped on restore");
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }
}
