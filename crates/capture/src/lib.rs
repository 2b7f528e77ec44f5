//! Event capture for the cell monitor.
//!
//! Handles:
//! - Execution capture with debounce and a bounded processed-cell cache
//! - Help sessions with a repeating heartbeat and two-tier cleanup
//! - Session reset
//! - The pipeline root wiring capture to transmission

pub mod extract;
pub mod help;
pub mod host;
pub mod manager;
pub mod pipeline;
pub mod processed;

pub use help::CleanupReport;
pub use host::*;
pub use manager::*;
pub use pipeline::*;
