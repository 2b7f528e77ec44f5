//! Load distribution: a seeded, bounded delay before each send.
//!
//! Many clients in one classroom emit the same event in the same second. The
//! delay is deterministic per `(identity, cell, second)` but changes from one
//! second to the next, so two users never collide permanently.

use monitor_core::LoadDistributionConfig;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Java-style rolling string hash over UTF-16 code units, wrapping in `i32`.
pub fn rolling_hash(seed: &str) -> i32 {
    seed.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Seed parts for one send: identity, cell and the current second.
pub fn seed_parts(identity: &str, cell_id: &str, now_ms: i64) -> [String; 3] {
    [
        identity.to_string(),
        cell_id.to_string(),
        now_ms.div_euclid(1000).to_string(),
    ]
}

/// Stateless delay calculator.
#[derive(Debug, Clone, Copy)]
pub struct LoadDistributor {
    floor_ms: u64,
    range_ms: u64,
}

impl Default for LoadDistributor {
    fn default() -> Self {
        Self::new(LoadDistributionConfig::default())
    }
}

impl LoadDistributor {
    pub fn new(config: LoadDistributionConfig) -> Self {
        Self {
            floor_ms: config.floor_ms,
            range_ms: config.range_ms.max(1),
        }
    }

    /// Delay in `[floor, floor + range)` for the concatenated seed parts.
    pub fn compute_delay<S: AsRef<str>>(&self, seed_parts: &[S]) -> Duration {
        let seed: String = seed_parts.iter().map(AsRef::as_ref).collect();
        let hash = i64::from(rolling_hash(&seed)).unsigned_abs();
        Duration::from_millis(hash % self.range_ms + self.floor_ms)
    }

    /// Waits the seeded delay, then sends.
    pub async fn apply<T, F, Fut>(
        &self,
        identity: &str,
        cell_id: &str,
        now_ms: i64,
        events: T,
        send: F,
    ) -> Fut::Output
    where
        F: FnOnce(T) -> Fut,
        Fut: Future,
    {
        let delay = self.compute_delay(&seed_parts(identity, cell_id, now_ms));
        debug!(cell_id = %cell_id, delay_ms = delay.as_millis() as u64, "Load distribution delay");
        tokio::time::sleep(delay).await;
        send(events).await
    }
}
