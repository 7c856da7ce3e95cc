//! DRAM-resident HNSW (Hierarchical Navigable Small World) index.
//!
//! Implements the layered proximity graph of Malkov & Yashunin. Payloads
//! live in a contiguous arena owned by the index; adjacency lives in
//! per-node lists, each behind its own mutex so parallel builders mutate
//! disjoint nodes without a global writer lock.
//!
//! # Locking discipline
//!
//! - One mutex per node guards that node's adjacency.
//! - One global mutex guards the `(entry_point, max_layer)` pair.
//! - At most one node mutex is held at a time, and the global mutex is
//!   never acquired while a node mutex is held, so the lock graph is
//!   cycle-free by construction.
//!
//! Payloads are written once when a build starts and never overwritten
//! in-place afterwards, which is what makes the lock-free payload reads
//! during neighbor pruning sound.

mod build;
mod persistence;
mod search;


use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::distance::DistanceMetric;
use crate::{VectorId, VectorData, Result};

use super::AnnIndex;

/// Graph node: adjacency lists indexed by layer, guarded by one mutex.
#[derive(Debug, Default)]
pub(crate) struct Node {
    pub(crate) layers: Mutex<Vec<Vec<VectorId>>>,
}

/// Entry point and top layer, always read and written together.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EntryState {
    pub(crate) entry_point: Option<VectorId>,
    pub(crate) max_layer: usize,
}

/// DRAM-resident HNSW index.
///
/// Thread-safe: searches may run concurrently on a completed index, and
/// [`HnswIndex::build_parallel`] runs multiple inserting workers under the
/// per-node locking discipline described at the module level.
#[derive(Debug)]
pub struct HnswIndex {
    pub(crate) dim: usize,
    pub(crate) m: usize,
    pub(crate) ef_construction: usize,
    pub(crate) metric: DistanceMetric,

    /// Flat payload arena; vector `i` occupies `[i*dim, (i+1)*dim)`.
    pub(crate) vectors: RwLock<Vec<f32>>,
    /// One entry per vector, sized when a build starts.
    pub(crate) nodes: RwLock<Vec<Node>>,
    pub(crate) entry: Mutex<EntryState>,

    /// When set, every distance computed on the search path bumps
    /// `search_distances`. Not meant to be toggled mid-search.
    search_stats_enabled: AtomicBool,
    search_distances: AtomicU64,
}

impl HnswIndex {
    /// Creates an empty index.
    ///
    /// # Arguments
    ///
    /// * `dim` - Vector dimension.
    /// * `m` - Max connections per node per layer (layer 0 gets `2*m`).
    /// * `ef_construction` - Candidate list size during insertion.
    /// * `metric` - Distance metric; fixed for the life of the index.
    #[must_use]
    pub fn new(dim: usize, m: usize, ef_construction: usize, metric: DistanceMetric) -> Self {
        Self {
            dim,
            m,
            ef_construction,
            metric,
            vectors: RwLock::new(Vec::new()),
            nodes: RwLock::new(Vec::new()),
            entry: Mutex::new(EntryState::default()),
            search_stats_enabled: AtomicBool::new(false),
            search_distances: AtomicU64::new(0),
        }
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// True when nothing has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// The `M` connectivity parameter.
    #[must_use]
    pub fn m(&self) -> usize {
        self.m
    }

    /// The construction-time candidate list size.
    #[must_use]
    pub fn ef_construction(&self) -> usize {
        self.ef_construction
    }

    /// Distance metric this index was created with.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Degree cap at `layer`: `2*M` at layer 0, `M` above.
    pub(crate) fn layer_cap(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m * 2
        } else {
            self.m
        }
    }

    /// Enables or disables the search-distance counter.
    pub fn enable_search_stats(&self, enable: bool) {
        self.search_stats_enabled.store(enable, Ordering::Relaxed);
    }

    /// Resets the search-distance counter to zero.
    pub fn reset_search_stats(&self) {
        self.search_distances.store(0, Ordering::Relaxed);
    }

    /// Number of distance computations performed by searches since the
    /// last reset, when the counter is enabled.
    #[must_use]
    pub fn search_distance_computations(&self) -> u64 {
        self.search_distances.load(Ordering::Relaxed)
    }

    /// Computes a query distance, counting it when search stats are on.
    pub(crate) fn query_distance(&self, a: &[f32], b: &[f32], count: bool) -> f32 {
        if count && self.search_stats_enabled.load(Ordering::Relaxed) {
            self.search_distances.fetch_add(1, Ordering::Relaxed);
        }
        self.metric.distance(a, b)
    }

    /// Hands the adjacency structure, entry point, and top layer to a
    /// caller that wants to reuse the built graph (the tiered variant
    /// builds through a DRAM index and takes the graph from here).
    #[must_use]
    pub fn export_graph(&self) -> (Vec<Vec<Vec<VectorId>>>, Option<VectorId>, usize) {
        let nodes = self.nodes.read();
        let graph = nodes.iter().map(|n| n.layers.lock().clone()).collect();
        let entry = *self.entry.lock();
        (graph, entry.entry_point, entry.max_layer)
    }
}

impl AnnIndex for HnswIndex {
    fn build(&self, data: &[VectorData]) -> Result<()> {
        HnswIndex::build(self, data)
    }

    fn build_parallel(&self, data: &[VectorData], num_threads: usize) -> Result<()> {
        HnswIndex::build_parallel(self, data, num_threads)
    }

    fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<VectorId> {
        HnswIndex::search(self, query, k, ef_search)
    }

    fn save(&self, path: &std::path::Path) -> Result<()> {
        HnswIndex::save(self, path)
    }

    fn len(&self) -> usize {
        HnswIndex::len(self)
    }

    fn dimension(&self) -> usize {
        HnswIndex::dimension(self)
    }
}

/// Slice of the payload arena holding vector `id`.
#[inline]
pub(crate) fn vector_of(vectors: &[f32], dim: usize, id: VectorId) -> &[f32] {
    let start = id as usize * dim;
    &vectors[start..start + dim]
}
