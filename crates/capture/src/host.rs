//! Host signals as they arrive from the notebook frontend.

use monitor_core::{CellHandle, CellOutput, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One UI signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum HostSignal {
    NotebookOpened { path: String },
    CellExecuted { cell: RecordedCell },
    HelpStart,
    HelpStop,
    NewSession,
}

/// Snapshot of an executed cell as serialized by the host.
///
/// Outputs stay raw until read so one malformed output degrades only that
/// capture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedCell {
    pub id: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub outputs: Option<Vec<Value>>,
    #[serde(default)]
    pub execution_count: Option<i64>,
    #[serde(default)]
    pub cell_type: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub execution_duration_ms: Option<u64>,
}

impl CellHandle for RecordedCell {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn source(&self) -> Result<String> {
        self.source
            .clone()
            .ok_or_else(|| Error::capture(format!("cell {} has no source text", self.id)))
    }

    fn outputs(&self) -> Result<Vec<CellOutput>> {
        let raw = self
            .outputs
            .as_ref()
            .ok_or_else(|| Error::capture(format!("cell {} has no output area", self.id)))?;

        raw.iter()
            .map(|output| {
                serde_json::from_value(output.clone()).map_err(|e| {
                    Error::capture(format!("cell {} has an unreadable output: {}", self.id, e))
                })
            })
            .collect()
    }

    fn execution_count(&self) -> Option<i64> {
        self.execution_count
    }

    fn cell_type(&self) -> Option<String> {
        self.cell_type.clone()
    }

    fn index(&self) -> Option<usize> {
        self.index
    }

    fn execution_duration_ms(&self) -> Option<u64> {
        self.execution_duration_ms
    }
}
