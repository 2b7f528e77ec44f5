//! Session handling types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One logical learning session. Resetting it clears all derived state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID (UUIDv4)
    pub id: Uuid,
}

impl Session {
    /// Creates a new session.
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
