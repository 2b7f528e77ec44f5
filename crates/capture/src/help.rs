//! Help-session table.
//!
//! One entry per notebook path. Stopped sessions stay tracked until the
//! time-based sweep or the count-based fail-safe removes them.

use std::collections::{HashMap, VecDeque};
use tokio::task::JoinHandle;

/// Help status for one notebook path.
#[derive(Debug)]
pub struct HelpSession {
    pub active: bool,
    pub started_at_ms: i64,
    timer: Option<JoinHandle<()>>,
}

impl HelpSession {
    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    fn cancel_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for HelpSession {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// What a cleanup pass removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Paths removed by the age sweep
    pub expired: Vec<String>,
    /// Path removed by the fail-safe, if it fired
    pub evicted: Option<String>,
}

impl CleanupReport {
    pub fn removed(&self) -> usize {
        self.expired.len() + usize::from(self.evicted.is_some())
    }
}

/// Bounded table of help sessions.
#[derive(Debug)]
pub struct HelpSessions {
    sessions: HashMap<String, HelpSession>,
    /// First-insertion order; front is oldest
    order: VecDeque<String>,
    max_sessions: usize,
    max_age_ms: i64,
}

impl HelpSessions {
    pub fn new(max_sessions: usize, max_age_ms: i64) -> Self {
        Self {
            sessions: HashMap::new(),
            order: VecDeque::new(),
            max_sessions,
            max_age_ms,
        }
    }

    pub fn get(&self, path: &str) -> Option<&HelpSession> {
        self.sessions.get(path)
    }

    pub fn has_timer(&self, path: &str) -> bool {
        self.sessions.get(path).is_some_and(HelpSession::has_timer)
    }

    /// Marks `path` active with a running heartbeat. An existing entry keeps
    /// its place in eviction order.
    pub fn activate(&mut self, path: &str, now_ms: i64, timer: Option<JoinHandle<()>>) {
        match self.sessions.get_mut(path) {
            Some(session) => {
                session.cancel_timer();
                session.active = true;
                session.started_at_ms = now_ms;
                session.timer = timer;
            }
            None => {
                self.order.push_back(path.to_string());
                self.sessions.insert(
                    path.to_string(),
                    HelpSession {
                        active: true,
                        started_at_ms: now_ms,
                        timer,
                    },
                );
            }
        }
    }

    /// Cancels the heartbeat for `path`. Returns whether one was running.
    pub fn stop(&mut self, path: &str) -> bool {
        match self.sessions.get_mut(path) {
            Some(session) => {
                session.active = false;
                session.cancel_timer()
            }
            None => false,
        }
    }

    /// Age sweep, then the count fail-safe.
    pub fn bulk_cleanup(&mut self, now_ms: i64) -> CleanupReport {
        let max_age_ms = self.max_age_ms;
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, s)| now_ms - s.started_at_ms > max_age_ms)
            .map(|(path, _)| path.clone())
            .collect();

        if !expired.is_empty() {
            for path in &expired {
                self.sessions.remove(path);
            }
            let sessions = &self.sessions;
            self.order.retain(|path| sessions.contains_key(path));
        }

        CleanupReport {
            expired,
            evicted: self.emergency_fifo_cleanup(),
        }
    }

    /// Evicts the single oldest entry if the table is at or above capacity.
    pub fn emergency_fifo_cleanup(&mut self) -> Option<String> {
        if self.sessions.len() < self.max_sessions {
            return None;
        }
        let oldest = self.order.pop_front()?;
        self.sessions.remove(&oldest);
        Some(oldest)
    }

    /// Drops every session, cancelling all timers. Returns how many timers
    /// were running.
    pub fn clear(&mut self) -> usize {
        let timers = self.active_timer_count();
        self.sessions.clear();
        self.order.clear();
        timers
    }

    pub fn active_timer_count(&self) -> usize {
        self.sessions.values().filter(|s| s.has_timer()).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
