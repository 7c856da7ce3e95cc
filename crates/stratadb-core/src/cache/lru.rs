//! LRU (least recently used) eviction policy.
//!
//! Backed by an `IndexMap` whose iteration order is the recency order:
//! front = least recently used, back = most recently used. Moving a key to
//! the back is a `shift_remove` + re-insert, amortized O(1) for the access
//! patterns the tiered cache produces.

use indexmap::IndexMap;

use super::CachePolicy;
use crate::VectorId;

/// Least-recently-used eviction policy.
pub struct LruPolicy {
    capacity: usize,
    /// Insertion-ordered key set; values are unused.
    order: IndexMap<VectorId, ()>,
}

impl LruPolicy {
    /// Creates an LRU policy admitting at most `capacity` keys.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: IndexMap::with_capacity(capacity),
        }
    }
}

impl CachePolicy for LruPolicy {
    fn record_access(&mut self, id: VectorId) {
        // Move to back (most recently used).
        if self.order.shift_remove(&id).is_some() {
            self.order.insert(id, ());
        }
    }

    fn on_insert(&mut self, id: VectorId) -> Option<VectorId> {
        if self.capacity == 0 {
            return None;
        }

        if self.order.contains_key(&id) {
            self.record_access(id);
            return None;
        }

        let mut evicted = None;
        if self.order.len() >= self.capacity {
            // Front of the map is the least recently used key.
            evicted = self.order.shift_remove_index(0).map(|(victim, ())| victim);
        }

        self.order.insert(id, ());
        evicted
    }

    fn erase(&mut self, id: VectorId) {
        self.order.shift_remove(&id);
    }

    fn clear(&mut self) {
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
