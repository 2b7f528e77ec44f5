//! Transient user notifications (toasts).
//!
//! Not part of the data contract; the host decides how to render them.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Notification types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Batch accepted by the collector
    Delivered { events: usize, attempts: u32 },
    /// Delivery failed; events dropped
    DeliveryFailed { events: usize, message: String },
    /// Settings fell back to defaults
    Degraded { message: String },
}

impl Notification {
    pub fn is_warning(&self) -> bool {
        !matches!(self, Self::Delivered { .. })
    }
}

/// Notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        if notification.is_warning() {
            warn!(notification = ?notification, "Notification");
        } else {
            info!(notification = ?notification, "Notification");
        }
    }
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: Notification) {}
}
