//! Best-effort extraction of cell source and outputs into an event.

use monitor_core::{CellHandle, CellOutput, Error, TelemetryEvent};

/// Fills the cell fields of `event`. Accessor failures leave their fields
/// empty and are returned for logging.
pub fn fill_cell_fields(event: &mut TelemetryEvent, cell: &dyn CellHandle) -> Vec<Error> {
    let mut failures = Vec::new();

    event.cell_index = cell.index();
    event.cell_type = cell.cell_type();
    event.execution_count = cell.execution_count();
    event.execution_duration_ms = cell.execution_duration_ms();

    match cell.source() {
        Ok(code) => event.code = Some(code),
        Err(e) => failures.push(e),
    }

    match cell.outputs() {
        Ok(outputs) => apply_outputs(event, &outputs),
        Err(e) => failures.push(e),
    }

    failures
}

/// First error output wins; otherwise the first textual rich output becomes
/// the result.
pub fn apply_outputs(event: &mut TelemetryEvent, outputs: &[CellOutput]) {
    let first_error = outputs.iter().find_map(|output| match output {
        CellOutput::Error { ename, evalue, .. } => Some(format!("{}: {}", ename, evalue)),
        _ => None,
    });

    match first_error {
        Some(message) => {
            event.has_error = Some(true);
            event.error_message = Some(message);
        }
        None => {
            event.has_error = Some(false);
            event.result = outputs.iter().find_map(CellOutput::plain_text);
        }
    }
}
