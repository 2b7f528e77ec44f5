//! Telemetry event records sent to the collector.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::iso8601;
use crate::session::Session;

/// All supported event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    NotebookOpened,
    CellExecuted,
    Help,
    HelpStop,
}

impl EventType {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotebookOpened => "notebook_opened",
            Self::CellExecuted => "cell_executed",
            Self::Help => "help",
            Self::HelpStop => "help_stop",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is producing events. Stamped on every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email_address: String,
    pub team_name: String,
    pub user_name: String,
}

impl Identity {
    /// Stable per-user seed for load distribution.
    pub fn seed(&self) -> &str {
        identity_seed(&self.email_address, &self.user_name)
    }
}

/// Email address when known, user name otherwise.
fn identity_seed<'a>(email_address: &'a str, user_name: &'a str) -> &'a str {
    if email_address.is_empty() {
        user_name
    } else {
        email_address
    }
}

/// One normalized learning-activity record ready for transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    /// ISO-8601; not monotonic across network delays
    pub event_time: String,
    pub email_address: String,
    pub team_name: String,
    pub user_name: String,
    pub session_id: Uuid,
    pub notebook_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_duration_ms: Option<u64>,
}

impl TelemetryEvent {
    /// Creates an event with a fresh id and the common session fields set.
    pub fn new(
        event_type: EventType,
        now_ms: i64,
        session: &Session,
        identity: &Identity,
        notebook_path: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            event_time: iso8601(now_ms),
            email_address: identity.email_address.clone(),
            team_name: identity.team_name.clone(),
            user_name: identity.user_name.clone(),
            session_id: session.id,
            notebook_path: notebook_path.into(),
            cell_id: None,
            cell_index: None,
            cell_type: None,
            code: None,
            execution_count: None,
            has_error: None,
            error_message: None,
            result: None,
            execution_duration_ms: None,
        }
    }

    /// Load-distribution seed of the user stamped on this event.
    pub fn identity_seed(&self) -> &str {
        identity_seed(&self.email_address, &self.user_name)
    }

    pub fn with_cell_id(mut self, cell_id: impl Into<String>) -> Self {
        self.cell_id = Some(cell_id.into());
        self
    }

    /// Key that near-simultaneous duplicates share: `cellId|eventType|minute`.
    ///
    /// Events without a cell fall back to the notebook path so help beacons
    /// from different notebooks never coalesce.
    pub fn request_key(&self, now_ms: i64) -> String {
        let subject = self.cell_id.as_deref().unwrap_or(&self.notebook_path);
        format!(
            "{}|{}|{}",
            subject,
            self.event_type,
            now_ms.div_euclid(60_000)
        )
    }
}
