// src/watch/coalesce.rs

//! Trailing-edge coalescing of bursts of notifications for the same key.
//!
//! Editors often produce several write notifications for a single save.
//! Each key is held until no new notification for it arrived for `window`,
//! then released exactly once.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Coalescer<K, V> {
    window: Duration,
    pending: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash + Clone, V> Coalescer<K, V> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a notification for `key` at `now`, pushing its release time
    /// back if it is already pending.
    pub fn push(&mut self, key: K, value: V, now: Instant) {
        self.pending.insert(key, (now + self.window, value));
    }

    /// Earliest release time of any pending key.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(at, _)| *at).min()
    }

    /// Remove and return everything due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, V)> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, (at, _))| *at <= now)
            .map(|(k, _)| k.clone())
            .collect();

        due.into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|(_, v)| (k, v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
