//! Reliable delivery of telemetry events to the collector.
//!
//! Layers, outermost first:
//! - In-flight dedup keyed by `cellId|eventType|minute`
//! - Optional load-distribution delay
//! - Retry with exponential backoff

pub mod client;
pub mod config;
pub mod inflight;
pub mod load_distribution;
pub mod retry;
pub mod transport;

pub use client::*;
pub use config::*;
pub use load_distribution::LoadDistributor;
pub use retry::{AttemptOutcome, Delivered, DeliveryResult};
pub use transport::*;
