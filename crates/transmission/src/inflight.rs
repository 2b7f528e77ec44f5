//! In-flight request registry.
//!
//! Maps a request key to the shared future of the delivery currently running
//! for it. Later callers with the same key await that future instead of
//! issuing their own network call.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::retry::DeliveryResult;

/// A delivery every duplicate caller can await.
pub type PendingDelivery = Shared<BoxFuture<'static, DeliveryResult>>;

/// Result of looking up a key.
pub enum Registration {
    /// A delivery for this key was already running.
    Joined(PendingDelivery),
    /// A new delivery was registered; the caller must drive it.
    Registered(PendingDelivery),
}

struct Entry {
    /// Distinguishes a re-registered key from the entry a finishing task owns
    generation: u64,
    pending: PendingDelivery,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_generation: u64,
}

/// In-flight request registry.
#[derive(Default)]
pub struct InFlightRegistry {
    inner: Mutex<Inner>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the pending delivery for `key`, or registers the one built by
    /// `make`. `make` receives the generation it must pass to [`complete`].
    ///
    /// [`complete`]: InFlightRegistry::complete
    pub fn join_or_register<F>(&self, key: &str, make: F) -> Registration
    where
        F: FnOnce(u64) -> BoxFuture<'static, DeliveryResult>,
    {
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.entries.get(key) {
            return Registration::Joined(entry.pending.clone());
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;

        let pending = make(generation).shared();
        inner.entries.insert(
            key.to_string(),
            Entry {
                generation,
                pending: pending.clone(),
            },
        );
        Registration::Registered(pending)
    }

    /// Removes `key` if it still belongs to `generation`.
    pub fn complete(&self, key: &str, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        match inner.entries.get(key) {
            Some(entry) if entry.generation == generation => {
                inner.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Drops every entry. Running deliveries still finish.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
