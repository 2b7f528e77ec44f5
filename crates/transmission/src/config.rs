//! Transmission client configuration.

use monitor_core::limits::RETRY_BASE_DELAY_MS;
use monitor_core::{LoadDistributionConfig, Settings};
use std::time::Duration;

/// Retry schedule: `base_delay × 2^(attempt−1)` between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }
}

/// Transmission client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionConfig {
    pub server_url: String,
    pub legacy_url: String,
    pub retry: RetryPolicy,
    pub use_load_distribution: bool,
    pub load_distribution: LoadDistributionConfig,
    pub show_notifications: bool,
    /// Mirror every submitted event to the legacy endpoint
    pub mirror_legacy: bool,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for TransmissionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            server_url: settings.server_url.clone(),
            legacy_url: settings.legacy_url(),
            retry: RetryPolicy {
                max_attempts: settings.retry_attempts.max(1),
                ..RetryPolicy::default()
            },
            use_load_distribution: settings.use_load_distribution,
            load_distribution: settings.load_distribution,
            show_notifications: settings.show_notifications,
            mirror_legacy: settings.mirror_legacy,
        }
    }
}
