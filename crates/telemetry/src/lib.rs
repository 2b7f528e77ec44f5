//! Structured logging and in-process metrics for the cell monitor.
//!
//! Metrics are owned by the pipeline root and handed to each component, so
//! two pipelines in one process never share counters.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
