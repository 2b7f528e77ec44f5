//! Retry core: one batch, bounded attempts, exponential backoff.

use monitor_core::{DeliveryError, TelemetryEvent};
use telemetry::Metrics;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::transport::Transport;

/// Successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    pub status: u16,
    pub attempts: u32,
}

/// Outcome shared by every caller awaiting one request.
pub type DeliveryResult = Result<Delivered, DeliveryError>;

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(u16),
    /// Status below 500: the collector handled it, retrying won't help
    Terminal(u16),
    /// 5xx, network error or timeout
    Retryable(String),
}

impl AttemptOutcome {
    pub fn classify(response: monitor_core::Result<u16>) -> Self {
        match response {
            Ok(status) if (200..300).contains(&status) => Self::Success(status),
            Ok(status) if status < 500 => Self::Terminal(status),
            Ok(status) => Self::Retryable(format!("collector returned {}", status)),
            Err(e) => Self::Retryable(e.to_string()),
        }
    }
}

/// POSTs `events`, retrying retryable failures per `policy`.
///
/// Once started the sequence runs to success, a terminal status, or
/// exhaustion.
pub async fn send_with_retry(
    transport: &dyn Transport,
    url: &str,
    events: &[TelemetryEvent],
    policy: &RetryPolicy,
    metrics: &Metrics,
) -> DeliveryResult {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_reason = String::new();

    for attempt in 1..=max_attempts {
        metrics.delivery_attempts.inc();

        match AttemptOutcome::classify(transport.post_events(url, events).await) {
            AttemptOutcome::Success(status) => {
                return Ok(Delivered {
                    status,
                    attempts: attempt,
                });
            }
            AttemptOutcome::Terminal(status) => {
                return Err(DeliveryError::Rejected { status });
            }
            AttemptOutcome::Retryable(reason) => {
                warn!(attempt, max_attempts, url = %url, error = %reason, "Delivery attempt failed");
                last_reason = reason;
            }
        }

        if attempt < max_attempts {
            let delay = policy.backoff(attempt);
            metrics.retries.inc();
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying delivery");
            tokio::time::sleep(delay).await;
        }
    }

    Err(DeliveryError::Exhausted {
        attempts: max_attempts,
        reason: last_reason,
    })
}
