//! Degradation log.
//!
//! Every fallback decision is recorded once: which component failed, how,
//! and what took over. The decision is permanent for the pipeline's
//! lifetime; the log exists so operators can see it happened.

use chrono::{DateTime, Utc};

/// A recorded fallback decision.
#[derive(Debug, Clone)]
pub struct DegradationEvent {
    pub component: &'static str,
    pub failure: String,
    pub fallback: &'static str,
    pub at: DateTime<Utc>,
}

/// Append-only log of degradations for one pipeline instance.
#[derive(Debug, Default)]
pub struct DegradationLog {
    events: Vec<DegradationEvent>,
}

impl DegradationLog {
    /// Record a fallback decision.
    pub fn record(
        &mut self,
        component: &'static str,
        failure: impl Into<String>,
        fallback: &'static str,
    ) {
        let failure = failure.into();
        tracing::warn!(component, failure = %failure, fallback, "pipeline degraded");
        self.events.push(DegradationEvent {
            component,
            failure,
            fallback,
            at: Utc::now(),
        });
    }

    pub fn events(&self) -> &[DegradationEvent] {
        &self.events
    }

    pub fn is_degraded(&self) -> bool {
        !self.events.is_empty()
    }
}
