//! LFU (least frequently used) eviction policy.
//!
//! Keeps a per-key frequency counter plus an ordered set keyed by
//! `(frequency, insertion sequence, id)`. The eviction victim is the
//! smallest element of that set: the lowest-frequency key, earliest
//! inserted on ties.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use super::CachePolicy;
use crate::VectorId;

/// Least-frequently-used eviction policy.
pub struct LfuPolicy {
    capacity: usize,
    /// id -> (frequency, insertion sequence).
    entries: FxHashMap<VectorId, (u64, u64)>,
    /// Ordered (frequency, sequence, id) triples; the minimum is the victim.
    by_freq: BTreeSet<(u64, u64, VectorId)>,
    /// Monotone counter for insertion order tie-breaking.
    next_seq: u64,
}

impl LfuPolicy {
    /// Creates an LFU policy admitting at most `capacity` keys.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: FxHashMap::default(),
            by_freq: BTreeSet::new(),
            next_seq: 0,
        }
    }
}

impl CachePolicy for LfuPolicy {
    fn record_access(&mut self, id: VectorId) {
        let Some(&(freq, seq)) = self.entries.get(&id) else {
            return;
        };
        self.by_freq.remove(&(freq, seq, id));
        self.by_freq.insert((freq + 1, seq, id));
        self.entries.insert(id, (freq + 1, seq));
    }

    fn on_insert(&mut self, id: VectorId) -> Option<VectorId> {
        if self.capacity == 0 {
            return None;
        }

        if self.entries.contains_key(&id) {
            self.record_access(id);
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            let lowest = self.by_freq.iter().next().copied();
            if let Some((freq, seq, victim)) = lowest {
                self.by_freq.remove(&(freq, seq, victim));
                self.entries.remove(&victim);
                evicted = Some(victim);
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(id, (1, seq));
        self.by_freq.insert((1, seq, id));
        evicted
    }

    fn erase(&mut self, id: VectorId) {
        if let Some((freq, seq)) = self.entries.remove(&id) {
            self.by_freq.remove(&(freq, seq, id));
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.by_freq.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
