//! Tests against a real HTTP collector.
//!
//! Spins up an in-process axum collector on a random port and drives the
//! reqwest-backed transport through it.

use capture::{HostSignal, Pipeline};
use integration_tests::fixtures;
use integration_tests::setup::TestCollector;
use monitor_core::{Error, NoopNotifier, Settings};
use std::sync::Arc;
use std::time::Duration;
use telemetry::Metrics;
use transmission::retry::send_with_retry;
use transmission::{AttemptOutcome, HttpTransport, RetryPolicy, Transport};

#[tokio::test]
async fn test_pipeline_posts_json_batches() {
    let collector = TestCollector::start().await;
    let settings = Settings {
        server_url: collector.url("/api/student-progress"),
        mirror_legacy: true,
        ..fixtures::settings()
    };
    let pipeline = Pipeline::with_http(settings, Arc::new(NoopNotifier)).unwrap();

    pipeline.handle(HostSignal::NotebookOpened {
        path: "week5/http.ipynb".into(),
    });
    pipeline.handle(HostSignal::CellExecuted {
        cell: fixtures::recorded_cell("c1", "print('ok')"),
    });
    pipeline.shutdown().await;

    let events = collector.events_on("student-progress");
    assert_eq!(events.len(), 2);
    let executed = events
        .iter()
        .find(|e| e["eventType"] == "cell_executed")
        .expect("cell_executed event");
    assert_eq!(executed["cellId"], "c1");
    assert_eq!(executed["code"], "print('ok')");
    assert_eq!(executed["notebookPath"], "week5/http.ipynb");
    assert_eq!(executed["emailAddress"], "ada@example.edu");
    assert!(executed["sessionId"].is_string());
    assert!(executed.get("errorMessage").is_none());

    assert_eq!(collector.events_on("cell-monitor").len(), 2);
    assert_eq!(pipeline.metrics().events_delivered.get(), 2);
}

#[tokio::test]
async fn test_statuses_are_classified() {
    let collector = TestCollector::start().await;
    let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
    let events = vec![fixtures::cell_event("c1")];

    let ok = transport
        .post_events(&collector.url("/api/student-progress"), &events)
        .await;
    assert_eq!(AttemptOutcome::classify(ok), AttemptOutcome::Success(200));

    let rejected = transport
        .post_events(&collector.url("/api/rejecting"), &events)
        .await;
    assert_eq!(AttemptOutcome::classify(rejected), AttemptOutcome::Terminal(400));

    let unavailable = transport
        .post_events(&collector.url("/api/unavailable"), &events)
        .await;
    assert!(matches!(
        AttemptOutcome::classify(unavailable),
        AttemptOutcome::Retryable(_)
    ));
}

#[tokio::test]
async fn test_unavailable_collector_exhausts_retries() {
    let collector = TestCollector::start().await;
    let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(50),
    };
    let metrics = Metrics::new();

    let result = send_with_retry(
        &transport,
        &collector.url("/api/unavailable"),
        &[fixtures::cell_event("c1")],
        &policy,
        &metrics,
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.code(), "DELIVERY_001");
    assert_eq!(metrics.delivery_attempts.get(), 2);
}

#[tokio::test]
async fn test_slow_collector_times_out() {
    let collector = TestCollector::start().await;
    let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();

    let result = transport
        .post_events(&collector.url("/api/slow"), &[fixtures::cell_event("c1")])
        .await;

    assert!(matches!(result, Err(Error::Transport(_))));
}

#[tokio::test]
async fn test_unreachable_collector_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(Duration::from_secs(1)).unwrap();
    let result = transport
        .post_events(
            &format!("http://{}/api/student-progress", addr),
            &[fixtures::cell_event("c1")],
        )
        .await;

    assert!(matches!(result, Err(Error::Transport(_))));
}
