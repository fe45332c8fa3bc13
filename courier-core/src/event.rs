//! Event types: the unit of work and its persisted form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants;

/// Collector category tag. Identifies which collector produced an event
/// and drives retention and flush urgency; the pipeline never looks past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventCategory {
    Error,
    UnhandledRejection,
    ResourceError,
    WhiteScreen,
    Performance,
    Network,
    RouteChange,
    Behavior,
    Snapshot,
    Replay,
    Custom,
}

impl EventCategory {
    /// Categories that must not wait for the batch timer.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            Self::Error | Self::UnhandledRejection | Self::ResourceError | Self::WhiteScreen
        )
    }

    /// Default retention window (seconds) before an undelivered event expires.
    pub fn retention_secs(self) -> u64 {
        match self {
            Self::Error | Self::UnhandledRejection | Self::ResourceError | Self::WhiteScreen => {
                constants::RETENTION_ERROR_SECS
            }
            // Payload-heavy recordings age out fastest.
            Self::Snapshot | Self::Replay => constants::RETENTION_REPLAY_SECS,
            _ => constants::RETENTION_DEFAULT_SECS,
        }
    }

    /// Stable string form, identical to the serde wire name. Used as the
    /// storage column value and as the key of retention overrides.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::UnhandledRejection => "unhandledRejection",
            Self::ResourceError => "resourceError",
            Self::WhiteScreen => "whiteScreen",
            Self::Performance => "performance",
            Self::Network => "network",
            Self::RouteChange => "routeChange",
            Self::Behavior => "behavior",
            Self::Snapshot => "snapshot",
            Self::Replay => "replay",
            Self::Custom => "custom",
        }
    }

    /// Inverse of [`EventCategory::as_str`].
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "error" => Some(Self::Error),
            "unhandledRejection" => Some(Self::UnhandledRejection),
            "resourceError" => Some(Self::ResourceError),
            "whiteScreen" => Some(Self::WhiteScreen),
            "performance" => Some(Self::Performance),
            "network" => Some(Self::Network),
            "routeChange" => Some(Self::RouteChange),
            "behavior" => Some(Self::Behavior),
            "snapshot" => Some(Self::Snapshot),
            "replay" => Some(Self::Replay),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Immutable record of an observed occurrence, produced by a collector.
///
/// The payload is opaque to the pipeline: it is stored, shipped, and
/// deleted, never interpreted or mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub category: EventCategory,
    /// Capture time, set by the producer, immutable thereafter.
    pub timestamp: DateTime<Utc>,
    /// Collector-defined payload.
    pub data: serde_json::Value,
}

impl Event {
    /// Capture an event now.
    pub fn new(category: EventCategory, data: serde_json::Value) -> Self {
        Self {
            category,
            timestamp: Utc::now(),
            data,
        }
    }

    /// Capture an event with an explicit timestamp.
    pub fn at(category: EventCategory, timestamp: DateTime<Utc>, data: serde_json::Value) -> Self {
        Self {
            category,
            timestamp,
            data,
        }
    }
}

/// An [`Event`] plus store-assigned delivery metadata.
///
/// Created on successful insertion by the delivery worker; read (never
/// mutated) by the batch transport; destroyed either by an acknowledged
/// delivery or by the TTL sweep, whichever comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    /// Store-assigned, monotonically increasing, never reused.
    pub id: i64,
    pub category: EventCategory,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
    /// Insertion time plus the category's retention window.
    pub expire_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Attach storage metadata to a captured event.
    pub fn from_event(id: i64, event: Event, expire_at: DateTime<Utc>) -> Self {
        Self {
            id,
            category: event.category,
            timestamp: event.timestamp,
            data: event.data,
            expire_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_categories() {
        assert!(EventCategory::Error.is_critical());
        assert!(EventCategory::UnhandledRejection.is_critical());
        assert!(EventCategory::ResourceError.is_critical());
        assert!(EventCategory::WhiteScreen.is_critical());
        assert!(!EventCategory::Performance.is_critical());
        assert!(!EventCategory::Replay.is_critical());
    }

    #[test]
    fn category_names_match_serde() {
        for category in [
            EventCategory::Error,
            EventCategory::UnhandledRejection,
            EventCategory::ResourceError,
            EventCategory::WhiteScreen,
            EventCategory::Performance,
            EventCategory::Network,
            EventCategory::RouteChange,
            EventCategory::Behavior,
            EventCategory::Snapshot,
            EventCategory::Replay,
            EventCategory::Custom,
        ] {
            let wire = serde_json::to_string(&category).unwrap();
            assert_eq!(wire, format!("\"{}\"", category.as_str()));
            assert_eq!(EventCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(EventCategory::parse("bogus"), None);
    }
}
