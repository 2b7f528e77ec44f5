//! Pipeline root: owns the client, the capture manager and the injected
//! diagnostics services for one notebook client.

use monitor_core::{
    Notification, Notifier, Result, Settings, SharedClock, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use telemetry::{Metrics, SharedMetrics};
use tracing::{info, warn};
use transmission::{HttpTransport, TransmissionClient, TransmissionConfig, Transport};

use crate::host::HostSignal;
use crate::manager::CaptureManager;

/// Capture → delivery pipeline.
pub struct Pipeline {
    settings: Settings,
    client: TransmissionClient,
    capture: CaptureManager,
    metrics: SharedMetrics,
}

impl Pipeline {
    /// Builds a pipeline around `transport`. Invalid settings fall back to
    /// defaults with a warning.
    pub fn new(
        settings: Settings,
        transport: Arc<dyn Transport>,
        clock: SharedClock,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (settings, warnings) = settings.sanitize();
        Self::assemble(settings, warnings, transport, clock, notifier)
    }

    /// Builds a pipeline posting over HTTP with the real clock.
    pub fn with_http(settings: Settings, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let (settings, warnings) = settings.sanitize();
        let transport = HttpTransport::new(Duration::from_millis(settings.request_timeout_ms))?;
        Ok(Self::assemble(
            settings,
            warnings,
            Arc::new(transport),
            Arc::new(SystemClock),
            notifier,
        ))
    }

    fn assemble(
        settings: Settings,
        warnings: Vec<monitor_core::Error>,
        transport: Arc<dyn Transport>,
        clock: SharedClock,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        for warning in &warnings {
            warn!(error = %warning, "Configuration fallback");
        }
        if !warnings.is_empty() && settings.show_notifications {
            notifier.notify(Notification::Degraded {
                message: format!("{} setting(s) replaced by defaults", warnings.len()),
            });
        }

        let metrics = Metrics::shared();
        let client = TransmissionClient::new(
            TransmissionConfig::from(&settings),
            transport,
            Arc::clone(&clock),
            Arc::clone(&metrics),
            notifier,
        );
        let capture = CaptureManager::new(
            Arc::new(client.clone()),
            settings.identity(),
            clock,
            Arc::clone(&metrics),
        );

        info!(
            server_url = %settings.server_url,
            load_distribution = settings.use_load_distribution,
            retry_attempts = settings.retry_attempts,
            session_id = %capture.session_id(),
            "Pipeline ready"
        );

        Self {
            settings,
            client,
            capture,
            metrics,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn capture(&self) -> &CaptureManager {
        &self.capture
    }

    pub fn client(&self) -> &TransmissionClient {
        &self.client
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Routes one host signal to its handler.
    pub fn handle(&self, signal: HostSignal) {
        match signal {
            HostSignal::NotebookOpened { path } => self.capture.on_notebook_opened(&path),
            HostSignal::CellExecuted { cell } => {
                self.capture.on_cell_executed(&cell);
            }
            HostSignal::HelpStart => {
                self.capture.start_help_session();
            }
            HostSignal::HelpStop => {
                self.capture.stop_help_session();
            }
            HostSignal::NewSession => {
                self.capture.start_new_session();
            }
        }
    }

    /// Stops heartbeats, waits for pending deliveries, then disposes the
    /// client.
    pub async fn shutdown(&self) {
        self.capture.dispose();
        self.capture.flush().await;
        self.client.dispose();

        let snapshot = self.metrics.snapshot();
        info!(
            captured = snapshot.events_captured,
            debounced = snapshot.executions_debounced,
            delivered = snapshot.events_delivered,
            rejected = snapshot.events_rejected,
            dropped = snapshot.events_dropped,
            retries = snapshot.retries,
            coalesced = snapshot.duplicates_coalesced,
            "Pipeline shut down"
        );
    }
}
