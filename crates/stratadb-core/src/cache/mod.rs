//! Cache eviction policies for the tiered storage layer.
//!
//! A policy tracks key membership and decides which resident key to evict
//! when the cache is full. The owning cache keeps the actual payload map;
//! the invariant is that the policy's key set always equals the cache's
//! resident key set.

use serde::{Deserialize, Serialize};

use crate::VectorId;

mod lfu;
mod lru;


pub use lfu::LfuPolicy;
pub use lru::LruPolicy;

/// Eviction policy bookkeeping for a bounded cache.
///
/// Policies never fail; every operation on an unknown key is a no-op.
pub trait CachePolicy: Send {
    /// Records an access to `id` (e.g., on a cache hit), making it the most
    /// valuable key under this policy. Unknown keys are ignored.
    fn record_access(&mut self, id: VectorId);

    /// Inserts `id` into the policy state.
    ///
    /// Returns the evicted victim when inserting at capacity. Re-inserting
    /// a key that is already present only refreshes it, as
    /// [`CachePolicy::record_access`] would.
    fn on_insert(&mut self, id: VectorId) -> Option<VectorId>;

    /// Removes `id` from the policy state.
    fn erase(&mut self, id: VectorId);

    /// Clears all state.
    fn clear(&mut self);

    /// Number of keys currently tracked.
    fn len(&self) -> usize;

    /// True when no keys are tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of keys this policy will admit.
    fn capacity(&self) -> usize;
}

/// Selects which eviction policy a [`crate::TieredBackend`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicyKind {
    /// Least-recently-used eviction.
    #[default]
    Lru,
    /// Least-frequently-used eviction, earliest-inserted on ties.
    Lfu,
}

impl CachePolicyKind {
    /// Instantiates the policy with the given capacity.
    #[must_use]
    pub fn build(self, capacity: usize) -> Box<dyn CachePolicy> {
        match self {
            Self::Lru => Box::new(LruPolicy::new(capacity)),
            Self::Lfu => Box::new(LfuPolicy::new(capacity)),
        }
    }
}
