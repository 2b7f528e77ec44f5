//! Common test setup functions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use capture::{CaptureManager, Pipeline};
use monitor_core::{EventType, ManualClock, Settings, TelemetryEvent};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use telemetry::Metrics;

use crate::fixtures;
use crate::mocks::{MockTransport, RecordingNotifier, RecordingSink};

/// Test context: a full pipeline over a mock transport and a manual clock.
///
/// This runs the same production code paths by:
/// - Using the real capture manager and transmission client
/// - Using MockTransport which implements the Transport trait
/// - Driving wall-clock time by hand for debounce and dedup windows
pub struct TestContext {
    pub clock: Arc<ManualClock>,
    pub transport: MockTransport,
    pub notifier: RecordingNotifier,
    pub pipeline: Pipeline,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(fixtures::settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let clock = Arc::new(ManualClock::new(fixtures::START_MS));
        let transport = MockTransport::new();
        let notifier = RecordingNotifier::new();
        let pipeline = Pipeline::new(
            settings,
            Arc::new(transport.clone()),
            clock.clone(),
            Arc::new(notifier.clone()),
        );

        Self {
            clock,
            transport,
            notifier,
            pipeline,
        }
    }

    pub fn capture(&self) -> &CaptureManager {
        self.pipeline.capture()
    }

    /// Wait for every delivery spawned so far.
    pub async fn settle(&self) {
        self.pipeline.capture().flush().await;
    }

    /// Events of `event_type` that reached the collector.
    pub fn delivered(&self, event_type: EventType) -> Vec<TelemetryEvent> {
        self.transport
            .events_sent_to(&self.pipeline.settings().server_url)
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture manager over a recording sink, for tests that only care about
/// what capture emits.
pub fn recording_manager() -> (CaptureManager, RecordingSink, Arc<ManualClock>) {
    let sink = RecordingSink::new();
    let clock = Arc::new(ManualClock::new(fixtures::START_MS));
    let manager = CaptureManager::new(
        Arc::new(sink.clone()),
        fixtures::identity(),
        clock.clone(),
        Arc::new(Metrics::new()),
    );
    (manager, sink, clock)
}

/// In-process collector bound to a random local port.
///
/// Routes:
/// - `POST /api/student-progress` stores the batch, answers 200
/// - `POST /api/cell-monitor` stores the batch, answers 200
/// - `POST /api/unavailable` answers 503
/// - `POST /api/rejecting` answers 400
/// - `POST /api/slow` answers after 2 seconds
pub struct TestCollector {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<(String, Value)>>>,
}

impl TestCollector {
    pub async fn start() -> Self {
        let received: Arc<Mutex<Vec<(String, Value)>>> = Arc::default();

        let app = Router::new()
            .route("/api/student-progress", post(store_progress))
            .route("/api/cell-monitor", post(store_legacy))
            .route("/api/unavailable", post(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route("/api/rejecting", post(|| async { StatusCode::BAD_REQUEST }))
            .route(
                "/api/slow",
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    StatusCode::OK
                }),
            )
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind collector");
        let addr = listener.local_addr().expect("Collector has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Collector stopped");
        });

        Self { addr, received }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Every event body received on `route`, flattened across batches.
    pub fn events_on(&self, route: &str) -> Vec<Value> {
        self.received
            .lock()
            .iter()
            .filter(|(r, _)| r == route)
            .flat_map(|(_, batch)| batch.as_array().cloned().unwrap_or_default())
            .collect()
    }
}

type Received = Arc<Mutex<Vec<(String, Value)>>>;

async fn store_progress(State(received): State<Received>, Json(batch): Json<Value>) -> StatusCode {
    received.lock().push(("student-progress".into(), batch));
    StatusCode::OK
}

async fn store_legacy(State(received): State<Received>, Json(batch): Json<Value>) -> StatusCode {
    received.lock().push(("cell-monitor".into(), batch));
    StatusCode::OK
}
