//! Transmission client: dedup, load distribution, retry.

use async_trait::async_trait;
use futures::future::{join_all, FutureExt};
use monitor_core::{DeliveryError, Notification, Notifier, SharedClock, TelemetryEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use telemetry::SharedMetrics;
use tracing::{debug, info, warn};

use crate::config::TransmissionConfig;
use crate::inflight::{InFlightRegistry, Registration};
use crate::load_distribution::LoadDistributor;
use crate::retry::{send_with_retry, DeliveryResult};
use crate::transport::Transport;

/// Destination of a send. Each channel keeps its own in-flight bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Progress,
    /// Backward-compatibility sink on the `cell-monitor` path
    Legacy,
}

/// Where capture hands finished events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn submit(&self, event: TelemetryEvent) -> DeliveryResult;
}

/// Delivers telemetry events to the collector.
#[derive(Clone)]
pub struct TransmissionClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: TransmissionConfig,
    transport: Arc<dyn Transport>,
    distributor: LoadDistributor,
    clock: SharedClock,
    metrics: SharedMetrics,
    notifier: Arc<dyn Notifier>,
    progress_in_flight: InFlightRegistry,
    legacy_in_flight: InFlightRegistry,
    disposed: AtomicBool,
}

impl TransmissionClient {
    pub fn new(
        config: TransmissionConfig,
        transport: Arc<dyn Transport>,
        clock: SharedClock,
        metrics: SharedMetrics,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                distributor: LoadDistributor::new(config.load_distribution),
                config,
                transport,
                clock,
                metrics,
                notifier,
                progress_in_flight: InFlightRegistry::new(),
                legacy_in_flight: InFlightRegistry::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &TransmissionConfig {
        &self.inner.config
    }

    /// Sends each event independently through dedup.
    pub async fn send_progress_data(&self, events: Vec<TelemetryEvent>) -> Vec<DeliveryResult> {
        join_all(
            events
                .into_iter()
                .map(|event| self.dispatch(Channel::Progress, event)),
        )
        .await
    }

    /// Sends one event, coalescing with an identical delivery already in flight.
    pub async fn send_single_event_with_deduplication(&self, event: TelemetryEvent) -> DeliveryResult {
        self.dispatch(Channel::Progress, event).await
    }

    /// Best-effort copy to the legacy endpoint. Same retry policy, separate
    /// in-flight registry.
    pub async fn send_legacy_data(&self, events: Vec<TelemetryEvent>) -> Vec<DeliveryResult> {
        join_all(
            events
                .into_iter()
                .map(|event| self.dispatch(Channel::Legacy, event)),
        )
        .await
    }

    /// Clears in-flight bookkeeping. Deliveries already running still finish;
    /// later sends skip dedup.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped =
            self.inner.progress_in_flight.clear() + self.inner.legacy_in_flight.clear();
        info!(dropped_entries = dropped, "Transmission client disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of keys with a delivery currently running.
    pub fn in_flight_count(&self) -> usize {
        self.inner.progress_in_flight.len() + self.inner.legacy_in_flight.len()
    }

    async fn dispatch(&self, channel: Channel, event: TelemetryEvent) -> DeliveryResult {
        let inner = &self.inner;

        if self.is_disposed() {
            return inner.send_single_event_internal(channel, vec![event]).await;
        }

        let key = event.request_key(inner.clock.now_ms());
        let task_key = key.clone();
        let task_inner = Arc::clone(inner);

        let registration = inner.registry(channel).join_or_register(&key, move |generation| {
            async move {
                task_inner.metrics.in_flight_requests.inc();
                let result = task_inner
                    .send_single_event_internal(channel, vec![event])
                    .await;
                task_inner.registry(channel).complete(&task_key, generation);
                task_inner.metrics.in_flight_requests.dec();
                result
            }
            .boxed()
        });

        match registration {
            Registration::Joined(pending) => {
                inner.metrics.duplicates_coalesced.inc();
                debug!(request_key = %key, "Coalesced duplicate delivery");
                pending.await
            }
            Registration::Registered(pending) => {
                // Driven by its own task so the delivery completes (and
                // leaves the registry) even if every caller goes away.
                tokio::spawn(pending.clone());
                pending.await
            }
        }
    }
}

impl ClientInner {
    fn registry(&self, channel: Channel) -> &InFlightRegistry {
        match channel {
            Channel::Progress => &self.progress_in_flight,
            Channel::Legacy => &self.legacy_in_flight,
        }
    }

    fn url(&self, channel: Channel) -> &str {
        match channel {
            Channel::Progress => &self.config.server_url,
            Channel::Legacy => &self.config.legacy_url,
        }
    }

    async fn send_single_event_internal(
        &self,
        channel: Channel,
        events: Vec<TelemetryEvent>,
    ) -> DeliveryResult {
        if !self.config.use_load_distribution {
            return self.send_progress_data_internal(channel, events).await;
        }

        let (identity, cell_id) = events
            .first()
            .map(|e| {
                (
                    e.identity_seed().to_string(),
                    e.cell_id.clone().unwrap_or_else(|| e.event_type.to_string()),
                )
            })
            .unwrap_or_default();

        self.distributor
            .apply(&identity, &cell_id, self.clock.now_ms(), events, |events| {
                self.send_progress_data_internal(channel, events)
            })
            .await
    }

    async fn send_progress_data_internal(
        &self,
        channel: Channel,
        events: Vec<TelemetryEvent>,
    ) -> DeliveryResult {
        let count = events.len();
        let url = self.url(channel);
        let start = tokio::time::Instant::now();

        let result = send_with_retry(
            self.transport.as_ref(),
            url,
            &events,
            &self.config.retry,
            &self.metrics,
        )
        .await;

        self.metrics
            .delivery_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        match &result {
            Ok(delivered) => {
                match channel {
                    Channel::Progress => self.metrics.events_delivered.inc_by(count as u64),
                    Channel::Legacy => self.metrics.legacy_deliveries.inc_by(count as u64),
                }
                debug!(
                    channel = ?channel,
                    count,
                    status = delivered.status,
                    attempts = delivered.attempts,
                    "Delivered events"
                );
                self.notify(Notification::Delivered {
                    events: count,
                    attempts: delivered.attempts,
                });
            }
            Err(e @ DeliveryError::Rejected { status }) => {
                self.metrics.events_rejected.inc_by(count as u64);
                warn!(channel = ?channel, count, status, "Collector rejected events");
                self.notify(Notification::DeliveryFailed {
                    events: count,
                    message: e.to_string(),
                });
            }
            Err(e @ DeliveryError::Exhausted { attempts, .. }) => {
                self.metrics.events_dropped.inc_by(count as u64);
                warn!(channel = ?channel, count, attempts, error = %e, "Dropping events after retries");
                self.notify(Notification::DeliveryFailed {
                    events: count,
                    message: e.to_string(),
                });
            }
        }

        result
    }

    fn notify(&self, notification: Notification) {
        if self.config.show_notifications {
            self.notifier.notify(notification);
        }
    }
}

#[async_trait]
impl EventSink for TransmissionClient {
    async fn submit(&self, event: TelemetryEvent) -> DeliveryResult {
        if !self.inner.config.mirror_legacy {
            return self.send_single_event_with_deduplication(event).await;
        }

        let legacy = event.clone();
        let (primary, _) = tokio::join!(
            self.send_single_event_with_deduplication(event),
            self.dispatch(Channel::Legacy, legacy)
        );
        primary
    }
}
