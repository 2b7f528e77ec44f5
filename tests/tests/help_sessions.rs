//! Help-session heartbeat and cleanup tests.
//!
//! Heartbeats run on tokio time, so these tests start with the clock paused
//! and let the runtime auto-advance through the intervals.

use integration_tests::fixtures;
use integration_tests::setup::{self, TestContext};
use monitor_core::{EventType, Settings};
use std::time::Duration;

const MINUTE_MS: i64 = 60_000;

#[tokio::test(start_paused = true)]
async fn test_heartbeat_repeats_until_stopped() {
    let (manager, sink, _) = setup::recording_manager();
    manager.on_notebook_opened("week2/loops.ipynb");

    assert!(manager.start_help_session());
    tokio::time::sleep(Duration::from_secs(35)).await;
    manager.stop_help_session();

    // Nothing more once stopped.
    tokio::time::sleep(Duration::from_secs(30)).await;
    manager.flush().await;

    assert_eq!(sink.count_of(EventType::Help), 4);
    assert_eq!(sink.count_of(EventType::HelpStop), 1);
    assert_eq!(manager.active_timer_count(), 0);
    assert!(sink
        .events()
        .iter()
        .filter(|e| e.event_type != EventType::NotebookOpened)
        .all(|e| e.notebook_path == "week2/loops.ipynb" && e.cell_id.is_none()));
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_through_client_with_load_distribution() {
    let ctx = TestContext::with_settings(Settings {
        use_load_distribution: true,
        ..fixtures::settings()
    });
    ctx.capture().on_notebook_opened("week2/loops.ipynb");

    let started = tokio::time::Instant::now();
    assert!(ctx.capture().start_help_session());
    tokio::time::sleep(Duration::from_secs(35)).await;
    ctx.capture().stop_help_session();
    tokio::time::sleep(Duration::from_secs(30)).await;
    ctx.settle().await;

    assert_eq!(ctx.delivered(EventType::Help).len(), 4);
    assert_eq!(ctx.delivered(EventType::HelpStop).len(), 1);
    assert_eq!(ctx.pipeline.metrics().duplicates_coalesced.get(), 0);

    // Every request waited out its seeded delay first.
    let calls = ctx.transport.calls();
    assert!(calls
        .iter()
        .all(|c| c.at - started >= Duration::from_millis(200)));
    let first_help = calls
        .iter()
        .find(|c| c.events[0].event_type == EventType::Help)
        .expect("help request");
    assert!(first_help.at - started < Duration::from_millis(2200));
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_a_no_op() {
    let (manager, sink, _) = setup::recording_manager();
    manager.on_notebook_opened("week2/loops.ipynb");

    assert!(manager.start_help_session());
    assert!(!manager.start_help_session());
    assert_eq!(manager.active_timer_count(), 1);

    tokio::time::sleep(Duration::from_secs(35)).await;
    manager.stop_help_session();
    manager.flush().await;

    assert_eq!(sink.count_of(EventType::Help), 4);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop_begins_a_new_heartbeat() {
    let (manager, sink, _) = setup::recording_manager();
    manager.on_notebook_opened("week2/loops.ipynb");

    manager.start_help_session();
    manager.stop_help_session();
    assert!(manager.start_help_session());
    tokio::time::sleep(Duration::from_secs(15)).await;
    manager.dispose();
    manager.flush().await;

    // Two immediate beacons plus one tick from the second heartbeat
    assert_eq!(sink.count_of(EventType::Help), 3);
    assert_eq!(sink.count_of(EventType::HelpStop), 1);
}

#[tokio::test]
async fn test_stop_without_session_still_emits_help_stop() {
    let (manager, sink, _) = setup::recording_manager();
    manager.on_notebook_opened("week2/loops.ipynb");

    let report = manager.stop_help_session();
    manager.flush().await;

    assert_eq!(report.removed(), 0);
    assert_eq!(sink.count_of(EventType::HelpStop), 1);
    assert_eq!(sink.count_of(EventType::Help), 0);
}

#[tokio::test]
async fn test_cleanup_sweeps_old_sessions_then_evicts_oldest() {
    let (manager, _sink, clock) = setup::recording_manager();

    for i in 0..5 {
        manager.on_notebook_opened(&format!("old-{i}.ipynb"));
        manager.start_help_session();
    }
    clock.advance(40 * MINUTE_MS);
    for i in 0..20 {
        manager.on_notebook_opened(&format!("new-{i}.ipynb"));
        manager.start_help_session();
    }
    assert_eq!(manager.tracked_help_sessions(), 25);
    assert_eq!(manager.active_timer_count(), 25);

    let report = manager.stop_help_session();

    assert_eq!(report.expired.len(), 5);
    assert!(report.expired.iter().all(|p| p.starts_with("old-")));
    assert_eq!(report.evicted.as_deref(), Some("new-0.ipynb"));
    assert_eq!(manager.tracked_help_sessions(), 19);
    // new-19 was stopped; expired and evicted sessions lost their timers
    assert_eq!(manager.active_timer_count(), 18);

    manager.dispose();
    assert_eq!(manager.active_timer_count(), 0);
}

#[tokio::test]
async fn test_cleanup_under_capacity_keeps_recent_sessions() {
    let (manager, _sink, clock) = setup::recording_manager();

    for i in 0..5 {
        manager.on_notebook_opened(&format!("old-{i}.ipynb"));
        manager.start_help_session();
    }
    clock.advance(40 * MINUTE_MS);
    for i in 0..10 {
        manager.on_notebook_opened(&format!("new-{i}.ipynb"));
        manager.start_help_session();
    }

    let report = manager.bulk_cleanup_old_sessions();

    assert_eq!(report.expired.len(), 5);
    assert_eq!(report.evicted, None);
    assert_eq!(manager.tracked_help_sessions(), 10);
    manager.dispose();
}

#[tokio::test(start_paused = true)]
async fn test_new_session_cancels_heartbeats() {
    let (manager, sink, _) = setup::recording_manager();
    manager.on_notebook_opened("week2/loops.ipynb");
    manager.start_help_session();

    manager.start_new_session();
    assert_eq!(manager.active_timer_count(), 0);
    assert_eq!(manager.tracked_help_sessions(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    manager.flush().await;

    assert_eq!(sink.count_of(EventType::Help), 1);
}
