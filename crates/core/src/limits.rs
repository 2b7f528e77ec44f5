//! Memory and timing limits for the capture pipeline.
//!
//! The client runs for hours inside a notebook tab, so every cache it keeps
//! is bounded here.

// === Debounce ===

/// Repeated executions of one cell inside this window are absorbed.
pub const DEBOUNCE_WINDOW_MS: i64 = 500;

/// Deltas above this are clamped (suspended tab, clock jump).
pub const MAX_EXECUTION_DELTA_MS: i64 = 5 * 60 * 1000;

/// Capacity of the processed-cell cache.
pub const MAX_PROCESSED_CELLS: usize = 50;

// === Help sessions ===

/// Interval between repeated `help` beacons.
pub const HELP_HEARTBEAT_INTERVAL_MS: u64 = 10_000;

/// Tracked help sessions older than this are swept.
pub const HELP_SESSION_MAX_AGE_MS: i64 = 30 * 60 * 1000;

/// Count-based fail-safe for the help-session table.
pub const MAX_HELP_SESSIONS: usize = 20;

// === Delivery ===

/// Width of the in-flight dedup bucket.
pub const DEDUP_BUCKET_MS: i64 = 60_000;

/// First retry delay; doubles per attempt.
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Per-request timeout for collector calls.
pub const REQUEST_TIMEOUT_MS: u64 = 8000;
