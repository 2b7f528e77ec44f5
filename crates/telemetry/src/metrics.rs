//! Pipeline metrics.
//!
//! Plain atomics; a snapshot is logged on shutdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Saturates at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// Histogram for delivery latency, including load-distribution and backoff
/// waits.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s
    buckets: [AtomicU64; 10],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 10] = [10, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for one pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Capture
    pub events_captured: Counter,
    pub executions_debounced: Counter,
    pub capture_errors: Counter,
    pub clock_anomalies: Counter,
    pub help_beacons: Counter,
    pub help_sessions_evicted: Counter,

    // Delivery
    pub events_delivered: Counter,
    pub events_rejected: Counter,
    pub events_dropped: Counter,
    pub delivery_attempts: Counter,
    pub retries: Counter,
    pub duplicates_coalesced: Counter,
    pub legacy_deliveries: Counter,

    pub delivery_latency_ms: Histogram,

    // Gauges
    pub in_flight_requests: Gauge,
    pub processed_cells: Gauge,
    pub tracked_help_sessions: Gauge,
}

/// Shared metrics handle.
pub type SharedMetrics = Arc<Metrics>;

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedMetrics {
        Arc::new(Self::new())
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_captured: self.events_captured.get(),
            executions_debounced: self.executions_debounced.get(),
            capture_errors: self.capture_errors.get(),
            clock_anomalies: self.clock_anomalies.get(),
            help_beacons: self.help_beacons.get(),
            help_sessions_evicted: self.help_sessions_evicted.get(),
            events_delivered: self.events_delivered.get(),
            events_rejected: self.events_rejected.get(),
            events_dropped: self.events_dropped.get(),
            delivery_attempts: self.delivery_attempts.get(),
            retries: self.retries.get(),
            duplicates_coalesced: self.duplicates_coalesced.get(),
            legacy_deliveries: self.legacy_deliveries.get(),
            delivery_latency_mean_ms: self.delivery_latency_ms.mean(),
            in_flight_requests: self.in_flight_requests.get(),
            processed_cells: self.processed_cells.get(),
            tracked_help_sessions: self.tracked_help_sessions.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_captured: u64,
    pub executions_debounced: u64,
    pub capture_errors: u64,
    pub clock_anomalies: u64,
    pub help_beacons: u64,
    pub help_sessions_evicted: u64,
    pub events_delivered: u64,
    pub events_rejected: u64,
    pub events_dropped: u64,
    pub delivery_attempts: u64,
    pub retries: u64,
    pub duplicates_coalesced: u64,
    pub legacy_deliveries: u64,
    pub delivery_latency_mean_ms: f64,
    pub in_flight_requests: u64,
    pub processed_cells: u64,
    pub tracked_help_sessions: u64,
}
