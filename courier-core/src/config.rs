//! Pipeline configuration: serde-loaded, override-friendly, with defaults
//! from [`crate::constants`].

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{CourierError, CourierResult};
use crate::event::EventCategory;

/// Eviction policy for the in-memory fallback buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowStrategy {
    /// Evict the oldest entry to make room; keeps the most recent events.
    #[default]
    Replace,
    /// Discard the incoming event once the buffer is full.
    Drop,
}

/// Configuration for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Collector endpoint receiving event batches.
    pub dsn: String,
    /// Application identifier stamped on every envelope.
    pub app_id: String,
    /// Path of the event database. `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
    /// Events per delivery chunk.
    pub batch_size: usize,
    /// Seconds between periodic flushes.
    pub flush_interval_secs: u64,
    /// Seconds between TTL sweeps.
    pub cleanup_interval_secs: u64,
    /// Consecutive failures tolerated before a flush attempt is abandoned.
    pub max_retries: u32,
    /// Base backoff delay (milliseconds).
    pub backoff_base_ms: u64,
    /// Backoff delay ceiling (milliseconds).
    pub backoff_cap_ms: u64,
    /// Fallback buffer capacity.
    pub max_queue_size: usize,
    /// Fallback buffer eviction policy.
    pub overflow_strategy: OverflowStrategy,
    /// Gzip request bodies on the batch path.
    pub enable_compression: bool,
    /// Per-category retention overrides (seconds). Key is the wire name.
    pub retention_overrides: HashMap<String, u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            app_id: String::new(),
            db_path: None,
            batch_size: constants::DEFAULT_BATCH_SIZE,
            flush_interval_secs: constants::DEFAULT_FLUSH_INTERVAL_SECS,
            cleanup_interval_secs: constants::DEFAULT_CLEANUP_INTERVAL_SECS,
            max_retries: constants::DEFAULT_MAX_RETRIES,
            backoff_base_ms: constants::DEFAULT_BACKOFF_BASE_MS,
            backoff_cap_ms: constants::DEFAULT_BACKOFF_CAP_MS,
            max_queue_size: constants::DEFAULT_MAX_QUEUE_SIZE,
            overflow_strategy: OverflowStrategy::default(),
            enable_compression: false,
            retention_overrides: HashMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Minimal configuration pointing at a collector.
    pub fn new(dsn: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            app_id: app_id.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> CourierResult<Self> {
        toml::from_str(toml_str).map_err(|e| CourierError::Config(e.to_string()))
    }

    /// Retention window (seconds) for a category, honoring overrides.
    pub fn retention_secs(&self, category: EventCategory) -> u64 {
        self.retention_overrides
            .get(category.as_str())
            .copied()
            .unwrap_or_else(|| category.retention_secs())
    }
}
