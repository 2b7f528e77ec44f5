//! Host notebook cell abstraction.
//!
//! Outputs follow the nbformat output shapes (`output_type` tag).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// One cell output as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum CellOutput {
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
    ExecuteResult {
        #[serde(default)]
        data: Map<String, Value>,
        #[serde(default)]
        execution_count: Option<i64>,
    },
    DisplayData {
        #[serde(default)]
        data: Map<String, Value>,
    },
    Stream {
        name: String,
        text: Value,
    },
}

impl CellOutput {
    /// Plain-text rendering of a rich output, if it has one.
    pub fn plain_text(&self) -> Option<String> {
        match self {
            Self::ExecuteResult { data, .. } | Self::DisplayData { data } => {
                data.get("text/plain").and_then(multiline_text)
            }
            _ => None,
        }
    }
}

/// nbformat stores text either as a string or as a list of lines.
fn multiline_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(lines) => Some(
            lines
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .concat(),
        ),
        _ => None,
    }
}

/// Read access to an executed cell. Accessors may fail; capture treats every
/// failure as partial data.
pub trait CellHandle: Send + Sync {
    fn id(&self) -> String;

    fn source(&self) -> Result<String>;

    fn outputs(&self) -> Result<Vec<CellOutput>>;

    fn execution_count(&self) -> Option<i64>;

    fn cell_type(&self) -> Option<String> {
        None
    }

    fn index(&self) -> Option<usize> {
        None
    }

    fn execution_duration_ms(&self) -> Option<u64> {
        None
    }
}
