//! Processed-cell cache used to debounce repeated execution notices.
//!
//! Losing an entry only risks one redundant capture.

use std::collections::{HashMap, VecDeque};

/// `cellId → lastProcessedEpochMs`, evicting the oldest inserted cell once
/// full.
#[derive(Debug)]
pub struct ProcessedCells {
    last_processed: HashMap<String, i64>,
    /// Insertion order; front is oldest
    order: VecDeque<String>,
    capacity: usize,
}

impl ProcessedCells {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);

        Self {
            last_processed: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn last_processed(&self, cell_id: &str) -> Option<i64> {
        self.last_processed.get(cell_id).copied()
    }

    /// Records `cell_id` as processed at `now_ms`. Returns the evicted cell,
    /// if inserting a new cell overflowed the cache.
    pub fn mark(&mut self, cell_id: &str, now_ms: i64) -> Option<String> {
        if let Some(ts) = self.last_processed.get_mut(cell_id) {
            *ts = now_ms;
            return None;
        }

        let evicted = if self.order.len() >= self.capacity {
            self.order.pop_front().inspect(|oldest| {
                self.last_processed.remove(oldest);
            })
        } else {
            None
        };

        self.order.push_back(cell_id.to_string());
        self.last_processed.insert(cell_id.to_string(), now_ms);
        evicted
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.last_processed.clear();
        self.order.clear();
    }
}
