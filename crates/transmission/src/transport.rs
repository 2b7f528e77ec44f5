//! Network seam for collector calls.

use async_trait::async_trait;
use monitor_core::{Error, Result, TelemetryEvent};
use std::time::Duration;
use tracing::debug;

/// Posts a batch of events to a collector URL.
///
/// Any HTTP response is `Ok(status)`; classification is left to the retry
/// core. Network failures and timeouts are `Err(Error::Transport)`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_events(&self, url: &str, events: &[TelemetryEvent]) -> Result<u16>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_events(&self, url: &str, events: &[TelemetryEvent]) -> Result<u16> {
        debug!(url = %url, count = events.len(), "Posting events");

        let response = self
            .http_client
            .post(url)
            .json(events)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::transport(format!("request timed out: {}", e))
                } else {
                    Error::transport(format!("request failed: {}", e))
                }
            })?;

        Ok(response.status().as_u16())
    }
}
