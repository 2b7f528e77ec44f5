//! Event capture and session manager.
//!
//! Turns host signals into telemetry events. Handlers never fail: capture
//! problems are logged and deliveries run in background tasks whose outcome
//! is reported through the delivery error taxonomy.

use monitor_core::limits::{
    DEBOUNCE_WINDOW_MS, HELP_HEARTBEAT_INTERVAL_MS, HELP_SESSION_MAX_AGE_MS,
    MAX_EXECUTION_DELTA_MS, MAX_HELP_SESSIONS, MAX_PROCESSED_CELLS,
};
use monitor_core::{CellHandle, EventType, Identity, Session, SharedClock, TelemetryEvent};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use telemetry::SharedMetrics;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use transmission::EventSink;
use uuid::Uuid;

use crate::extract::fill_cell_fields;
use crate::help::{CleanupReport, HelpSessions};
use crate::processed::ProcessedCells;

/// Result of an execution notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// An event with this id was handed to delivery
    Emitted(Uuid),
    /// Duplicate notice inside the debounce window
    Debounced,
}

/// Event capture and session manager.
#[derive(Clone)]
pub struct CaptureManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    sink: Arc<dyn EventSink>,
    identity: Identity,
    clock: SharedClock,
    metrics: SharedMetrics,
    heartbeat_interval: Duration,
    state: Mutex<CaptureState>,
    deliveries: Mutex<JoinSet<()>>,
}

struct CaptureState {
    session: Session,
    notebook_path: String,
    processed: ProcessedCells,
    help: HelpSessions,
}

impl CaptureManager {
    pub fn new(
        sink: Arc<dyn EventSink>,
        identity: Identity,
        clock: SharedClock,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                sink,
                identity,
                clock,
                metrics,
                heartbeat_interval: Duration::from_millis(HELP_HEARTBEAT_INTERVAL_MS),
                state: Mutex::new(CaptureState {
                    session: Session::new(),
                    notebook_path: String::new(),
                    processed: ProcessedCells::new(MAX_PROCESSED_CELLS),
                    help: HelpSessions::new(MAX_HELP_SESSIONS, HELP_SESSION_MAX_AGE_MS),
                }),
                deliveries: Mutex::new(JoinSet::new()),
            }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.state.lock().session.id
    }

    pub fn notebook_path(&self) -> String {
        self.inner.state.lock().notebook_path.clone()
    }

    pub fn processed_cell_count(&self) -> usize {
        self.inner.state.lock().processed.len()
    }

    pub fn active_timer_count(&self) -> usize {
        self.inner.state.lock().help.active_timer_count()
    }

    pub fn tracked_help_sessions(&self) -> usize {
        self.inner.state.lock().help.len()
    }

    /// Makes `path` the current notebook and emits `notebook_opened`.
    pub fn on_notebook_opened(&self, path: &str) {
        let event = {
            let mut state = self.inner.state.lock();
            state.notebook_path = path.to_string();
            self.inner.event(&state, EventType::NotebookOpened, path)
        };
        info!(notebook_path = %path, "Notebook opened");
        self.inner.emit(event);
    }

    /// Captures one execution notice.
    pub fn on_cell_executed(&self, cell: &dyn CellHandle) -> CaptureOutcome {
        let cell_id = cell.id();
        let now = self.inner.clock.now_ms();

        let mut event = {
            let mut state = self.inner.state.lock();
            let previous = state.processed.last_processed(&cell_id);

            let raw_delta = previous.map_or(0, |last| now - last);
            if raw_delta > MAX_EXECUTION_DELTA_MS {
                self.inner.metrics.clock_anomalies.inc();
                warn!(
                    cell_id = %cell_id,
                    delta_ms = raw_delta,
                    "Execution delta above 5 minutes, clamping"
                );
            }
            let delta = raw_delta.clamp(0, MAX_EXECUTION_DELTA_MS);

            if previous.is_some() && delta < DEBOUNCE_WINDOW_MS {
                self.inner.metrics.executions_debounced.inc();
                debug!(cell_id = %cell_id, delta_ms = delta, "Debounced duplicate execution");
                return CaptureOutcome::Debounced;
            }

            if let Some(evicted) = state.processed.mark(&cell_id, now) {
                debug!(evicted = %evicted, "Processed-cell cache full, evicted oldest");
            }
            self.inner
                .metrics
                .processed_cells
                .set(state.processed.len() as u64);

            let path = state.notebook_path.clone();
            self.inner
                .event_at(&state, EventType::CellExecuted, &path, now)
                .with_cell_id(cell_id.as_str())
        };

        for failure in fill_cell_fields(&mut event, cell) {
            self.inner.metrics.capture_errors.inc();
            warn!(cell_id = %cell_id, error = %failure, "Partial cell capture");
        }

        self.inner.metrics.events_captured.inc();
        let event_id = event.event_id;
        self.inner.emit(event);
        CaptureOutcome::Emitted(event_id)
    }

    /// Emits `help` now and every heartbeat interval until stopped. No-op if
    /// the current notebook already has a running heartbeat.
    pub fn start_help_session(&self) -> bool {
        let event = {
            let mut state = self.inner.state.lock();
            let path = state.notebook_path.clone();

            if state.help.has_timer(&path) {
                debug!(notebook_path = %path, "Help session already active");
                return false;
            }

            let timer = tokio::spawn(heartbeat(
                Arc::downgrade(&self.inner),
                path.clone(),
                self.inner.heartbeat_interval,
            ));
            state.help.activate(&path, self.inner.clock.now_ms(), Some(timer));
            self.inner
                .metrics
                .tracked_help_sessions
                .set(state.help.len() as u64);

            info!(notebook_path = %path, "Help session started");
            self.inner.event(&state, EventType::Help, &path)
        };

        self.inner.metrics.help_beacons.inc();
        self.inner.emit(event);
        true
    }

    /// Cancels the heartbeat, emits one `help_stop` and runs the cleanup.
    ///
    /// Emits `help_stop` even when no session was running.
    pub fn stop_help_session(&self) -> CleanupReport {
        let event = {
            let mut state = self.inner.state.lock();
            let path = state.notebook_path.clone();

            if state.help.stop(&path) {
                info!(notebook_path = %path, "Help session stopped");
            } else {
                debug!(notebook_path = %path, "Help stop without a running session");
            }
            self.inner.event(&state, EventType::HelpStop, &path)
        };

        self.inner.emit(event);
        self.bulk_cleanup_old_sessions()
    }

    /// Sweeps help sessions older than 30 minutes, then evicts the oldest one
    /// if the table is still full.
    pub fn bulk_cleanup_old_sessions(&self) -> CleanupReport {
        let now = self.inner.clock.now_ms();
        let mut state = self.inner.state.lock();
        let report = state.help.bulk_cleanup(now);

        if report.removed() > 0 {
            self.inner
                .metrics
                .help_sessions_evicted
                .inc_by(report.removed() as u64);
            debug!(
                expired = report.expired.len(),
                evicted = ?report.evicted,
                remaining = state.help.len(),
                "Cleaned up help sessions"
            );
        }
        self.inner
            .metrics
            .tracked_help_sessions
            .set(state.help.len() as u64);
        report
    }

    /// Starts a new logical session: cancels every heartbeat, issues a fresh
    /// session id and empties every bounded cache.
    pub fn start_new_session(&self) -> Uuid {
        let mut state = self.inner.state.lock();
        let cancelled = state.help.clear();
        state.processed.clear();
        state.session = Session::new();

        self.inner.metrics.processed_cells.set(0);
        self.inner.metrics.tracked_help_sessions.set(0);
        info!(session_id = %state.session.id, cancelled_timers = cancelled, "New session");
        state.session.id
    }

    /// Waits for every delivery spawned so far.
    pub async fn flush(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.inner.deliveries.lock());
            if pending.is_empty() {
                return;
            }
            while pending.join_next().await.is_some() {}
        }
    }

    /// Cancels every heartbeat. Deliveries already spawned still finish.
    pub fn dispose(&self) {
        let cancelled = self.inner.state.lock().help.clear();
        self.inner.metrics.tracked_help_sessions.set(0);
        debug!(cancelled_timers = cancelled, "Capture manager disposed");
    }
}

impl ManagerInner {
    fn event(&self, state: &CaptureState, event_type: EventType, path: &str) -> TelemetryEvent {
        self.event_at(state, event_type, path, self.clock.now_ms())
    }

    fn event_at(
        &self,
        state: &CaptureState,
        event_type: EventType,
        path: &str,
        now_ms: i64,
    ) -> TelemetryEvent {
        TelemetryEvent::new(event_type, now_ms, &state.session, &self.identity, path)
    }

    /// Re-emits `help` for `path` from the heartbeat task.
    fn beacon(&self, path: &str) {
        let event = {
            let state = self.state.lock();
            self.event(&state, EventType::Help, path)
        };
        self.metrics.help_beacons.inc();
        debug!(notebook_path = %path, "Help heartbeat");
        self.emit(event);
    }

    /// Hands `event` to the sink on a background task.
    fn emit(&self, event: TelemetryEvent) {
        let sink = Arc::clone(&self.sink);
        let mut deliveries = self.deliveries.lock();

        // Reap finished deliveries so the set stays bounded.
        while deliveries.try_join_next().is_some() {}

        deliveries.spawn(async move {
            let event_id = event.event_id;
            let event_type = event.event_type;
            match sink.submit(event).await {
                Ok(delivered) => {
                    debug!(%event_id, %event_type, attempts = delivered.attempts, "Event delivered");
                }
                Err(e) => {
                    debug!(%event_id, %event_type, code = e.code(), retryable = e.is_retryable(), "Event not delivered");
                }
            }
        });
    }
}

/// Heartbeat loop for one help session. Exits when the manager is gone;
/// otherwise runs until its handle is aborted.
async fn heartbeat(inner: Weak<ManagerInner>, path: String, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.beacon(&path);
    }
}
