//! Tier-aware HNSW index.
//!
//! Keeps the graph structure in DRAM but resolves every vector payload
//! through a [`StorageBackend`], typically a [`crate::TieredBackend`] whose
//! cache and I/O statistics then reflect the index's access pattern.
//!
//! Builds run through an inner DRAM [`HnswIndex`] (payload reads during
//! construction would otherwise thrash the cache tier), after which the
//! graph is taken over and the payloads are written through the backend.
//! From that point the backend owns payload durability; this index never
//! persists payloads itself.

mod persistence;


use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::info;

use crate::distance::DistanceMetric;
use crate::index::ordered_float::OrderedFloat;
use crate::index::visited::{VisitedScratch, SEARCH_SCRATCH};
use crate::storage::StorageBackend;
use crate::{Result, VectorData, VectorId};

use super::{AnnIndex, HnswIndex};

/// Graph structure shared by save/load and search. Immutable between
/// builds, so traversal needs no per-node locking.
#[derive(Debug, Default)]
pub(crate) struct TieredGraph {
    /// `nodes[id][layer]` = adjacency of `id` at `layer`.
    pub(crate) nodes: Vec<Vec<Vec<VectorId>>>,
    pub(crate) entry_point: Option<VectorId>,
    pub(crate) max_layer: usize,
    pub(crate) num_vectors: usize,
}

/// HNSW variant whose payloads live behind a storage backend.
pub struct TieredHnswIndex {
    pub(crate) dim: usize,
    pub(crate) m: usize,
    pub(crate) ef_construction: usize,
    pub(crate) metric: DistanceMetric,
    storage: Arc<dyn StorageBackend>,
    pub(crate) graph: RwLock<TieredGraph>,
}

impl std::fmt::Debug for TieredHnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredHnswIndex")
            .field("dim", &self.dim)
            .field("m", &self.m)
            .field("ef_construction", &self.ef_construction)
            .field("metric", &self.metric)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl TieredHnswIndex {
    /// Creates an empty tier-aware index over `storage`.
    #[must_use]
    pub fn new(
        dim: usize,
        storage: Arc<dyn StorageBackend>,
        m: usize,
        ef_construction: usize,
        metric: DistanceMetric,
    ) -> Self {
        Self {
            dim,
            m,
            ef_construction,
            metric,
            storage,
            graph: RwLock::new(TieredGraph::default()),
        }
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.read().num_vectors
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

    /// Distance metric this index was created with.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// The storage backend resolving this index's payloads.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Builds the graph with an inner DRAM index, then writes every
    /// payload through the storage backend.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DimensionMismatch`] for malformed rows or
    /// a storage error from the payload writes.
    pub fn build(&self, data: &[VectorData]) -> Result<()> {
        self.build_with(data, |inner| inner.build(data))
    }

    /// Parallel variant of [`TieredHnswIndex::build`].
    ///
    /// # Errors
    ///
    /// Same conditions as [`TieredHnswIndex::build`].
    pub fn build_parallel(&self, data: &[VectorData], num_threads: usize) -> Result<()> {
        self.build_with(data, |inner| inner.build_parallel(data, num_threads))
    }

    fn build_with(
        &self,
        data: &[VectorData],
        run_build: impl FnOnce(&HnswIndex) -> Result<()>,
    ) -> Result<()> {
        let start = Instant::now();
        self.storage.reset_stats();

        let inner = HnswIndex::new(self.dim, self.m, self.ef_construction, self.metric);
        run_build(&inner)?;
        let (nodes, entry_point, max_layer) = inner.export_graph();

        // Payloads become durable in the backend before the graph goes
        // live, so searches never race ahead of the storage tier.
        for (id, row) in data.iter().enumerate() {
            self.storage.write(id as VectorId, row)?;
        }

        let mut graph = self.graph.write();
        graph.num_vectors = data.len();
        graph.nodes = nodes;
        graph.entry_point = entry_point;
        graph.max_layer = max_layer;
        drop(graph);

        info!(
            num_vectors = data.len(),
            elapsed_s = start.elapsed().as_secs_f64(),
            "tiered hnsw build complete"
        );
        Ok(())
    }

    /// Loads one payload through the backend. Absent ids and I/O failures
    /// both surface as `None`; the backend accounts the attempt.
    fn load_vector(&self, id: VectorId) -> Option<VectorData> {
        self.storage.read(id).ok().flatten()
    }

    /// Best-first search within one layer, payloads resolved per visit.
    fn search_layer_tiered(
        &self,
        graph: &TieredGraph,
        query: &[f32],
        entry: VectorId,
        ef: usize,
        layer: usize,
        scratch: &mut VisitedScratch,
    ) -> Vec<(VectorId, f32)> {
        if graph.num_vectors == 0 {
            return Vec::new();
        }

        scratch.begin(graph.num_vectors);

        let mut candidates: BinaryHeap<Reverse<(OrderedFloat, VectorId)>> = BinaryHeap::new();
        let mut results: BinaryHeap<(OrderedFloat, VectorId)> = BinaryHeap::new();

        let Some(entry_vec) = self.load_vector(entry) else {
            return Vec::new();
        };
        let entry_dist = self.metric.distance(query, &entry_vec);
        candidates.push(Reverse((OrderedFloat(entry_dist), entry)));
        results.push((OrderedFloat(entry_dist), entry));
        scratch.insert(entry);

        while let Some(Reverse((OrderedFloat(dist), node))) = candidates.pop() {
            let worst = results.peek().map_or(f32::INFINITY, |r| r.0 .0);
            if dist > worst && results.len() >= ef {
                break;
            }

            let Some(layer_list) = graph.nodes[node as usize].get(layer) else {
                continue;
            };
            for &nb in layer_list {
                if !scratch.insert(nb) {
                    continue;
                }
                // A missing payload skips the neighbor rather than failing
                // the query.
                let Some(nb_vec) = self.load_vector(nb) else {
                    continue;
                };
                let d = self.metric.distance(query, &nb_vec);
                let worst = results.peek().map_or(f32::INFINITY, |r| r.0 .0);
                if results.len() < ef || d < worst {
                    candidates.push(Reverse((OrderedFloat(d), nb)));
                    results.push((OrderedFloat(d), nb));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<(VectorId, f32)> = results
            .into_iter()
            .map(|(OrderedFloat(d), id)| (id, d))
            .collect();
        out.sort_by(|a, b| a.1.total_cmp(&b.1));
        out
    }

    /// Searches for the `k` nearest neighbors of `query`, resolving
    /// payloads through the storage backend (and so exercising its cache).
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<VectorId> {
        let graph = self.graph.read();
        if graph.num_vectors == 0 {
            return Vec::new();
        }
        let Some(mut ep) = graph.entry_point else {
            return Vec::new();
        };

        SEARCH_SCRATCH.with(|cell| {
            let mut scratch = cell.borrow_mut();

            for layer in (1..=graph.max_layer).rev() {
                let res = self.search_layer_tiered(&graph, query, ep, 1, layer, &mut scratch);
                if let Some(&(best, _)) = res.first() {
                    ep = best;
                }
            }

            let res0 = self.search_layer_tiered(&graph, query, ep, ef_search, 0, &mut scratch);
            res0.into_iter().take(k).map(|(id, _)| id).collect()
        })
    }
}

impl AnnIndex for TieredHnswIndex {
    fn build(&self, data: &[VectorData]) -> Result<()> {
        TieredHnswIndex::build(self, data)
    }

    fn build_parallel(&self, data: &[VectorData], num_threads: usize) -> Result<()> {
        TieredHnswIndex::build_parallel(self, data, num_threads)
    }

    fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<VectorId> {
        TieredHnswIndex::search(self, query, k, ef_search)
    }

    fn save(&self, path: &Path) -> Result<()> {
        TieredHnswIndex::save(self, path)
    }

    fn len(&self) -> usize {
        TieredHnswIndex::len(self)
    }

    fn dimension(&self) -> usize {
        TieredHnswIndex::dimension(self)
    }
}
