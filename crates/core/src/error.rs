//! Unified error types for the cell monitor pipeline.
//!
//! Error codes:
//! - CAPTURE_001: Cell source/outputs could not be read
//! - DELIVERY_001: Retries exhausted (retryable failure, event dropped)
//! - DELIVERY_002: Collector rejected the batch (terminal, no retry)
//! - CONFIG_001: Invalid or missing setting replaced by its default

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Delivery failure shared by every caller awaiting the same request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Collector answered with a non-success status below 500.
    #[error("[DELIVERY_002] collector rejected batch with status {status}")]
    Rejected { status: u16 },

    /// Every attempt failed with a network error or a 5xx status.
    #[error("[DELIVERY_001] gave up after {attempts} attempts: {reason}")]
    Exhausted { attempts: u32, reason: String },
}

impl DeliveryError {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "DELIVERY_002",
            Self::Exhausted { .. } => "DELIVERY_001",
        }
    }

    /// True for failures of the retryable class (network, timeout, 5xx).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Unified error type for the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("[CAPTURE_001] {0}")]
    Capture(String),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("[CONFIG_001] {field}: {message}")]
    Configuration { field: &'static str, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub fn configuration(field: &'static str, msg: impl Into<String>) -> Self {
        Self::Configuration {
            field,
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Capture(_) => Some("CAPTURE_001"),
            Self::Delivery(e) => Some(e.code()),
            Self::Configuration { .. } => Some("CONFIG_001"),
            _ => None,
        }
    }
}
