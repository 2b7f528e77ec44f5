//! Test fixtures and event generators.

use capture::RecordedCell;
use monitor_core::{CellOutput, EventType, Identity, Session, Settings, TelemetryEvent};
use serde_json::{json, Map};

use crate::mocks::MockCell;

pub const START_MS: i64 = 1_700_000_000_000;
pub const COLLECTOR_URL: &str = "http://collector.test/api/student-progress";
pub const LEGACY_URL: &str = "http://collector.test/api/cell-monitor";

pub fn identity() -> Identity {
    Identity {
        email_address: "ada@example.edu".into(),
        team_name: "team-7".into(),
        user_name: "ada".into(),
    }
}

/// Settings with load distribution off so request timing is deterministic.
pub fn settings() -> Settings {
    let identity = identity();
    Settings {
        server_url: COLLECTOR_URL.into(),
        use_load_distribution: false,
        show_notifications: true,
        email_address: identity.email_address,
        team_name: identity.team_name,
        user_name: identity.user_name,
        ..Settings::default()
    }
}

/// A `cell_executed` event for `cell_id`.
pub fn cell_event(cell_id: &str) -> TelemetryEvent {
    TelemetryEvent::new(
        EventType::CellExecuted,
        START_MS,
        &Session::new(),
        &identity(),
        "week1/intro.ipynb",
    )
    .with_cell_id(cell_id)
}

/// A cell that evaluated to `text`.
pub fn cell_with_result(id: &str, source: &str, text: &str) -> MockCell {
    let mut data = Map::new();
    data.insert("text/plain".into(), json!(text));
    MockCell::new(id, source).with_outputs(vec![CellOutput::ExecuteResult {
        data,
        execution_count: Some(1),
    }])
}

/// A cell that raised `ename: evalue`.
pub fn cell_with_error(id: &str, source: &str, ename: &str, evalue: &str) -> MockCell {
    MockCell::new(id, source).with_outputs(vec![CellOutput::Error {
        ename: ename.into(),
        evalue: evalue.into(),
        traceback: vec![],
    }])
}

/// A host-serialized cell with raw nbformat outputs.
pub fn recorded_cell(id: &str, source: &str) -> RecordedCell {
    RecordedCell {
        id: id.into(),
        source: Some(source.into()),
        outputs: Some(vec![json!({
            "output_type": "stream",
            "name": "stdout",
            "text": "ok\n"
        })]),
        execution_count: Some(1),
        ..RecordedCell::default()
    }
}
