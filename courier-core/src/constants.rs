/// Courier system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of events per delivery chunk.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default interval between periodic flushes (seconds).
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 10;

/// Default interval between TTL sweeps (seconds).
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Default consecutive-failure budget for one flush attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Upper bound on a single backoff delay (milliseconds).
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 30_000;

/// Default fallback buffer capacity.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Hard cap on events pulled from the store in one flush cycle.
pub const MAX_PULL_SIZE: usize = 1_000;

/// Retention window for ordinary events (seconds).
pub const RETENTION_DEFAULT_SECS: u64 = 7 * 24 * 3_600;

/// Retention window for error-class events (seconds).
pub const RETENTION_ERROR_SECS: u64 = 14 * 24 * 3_600;

/// Retention window for snapshot/replay payloads (seconds).
pub const RETENTION_REPLAY_SECS: u64 = 24 * 3_600;

/// Timeout for fire-and-forget unload sends (milliseconds).
pub const BEACON_TIMEOUT_MS: u64 = 800;

/// Timeout for regular batch requests (milliseconds).
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
