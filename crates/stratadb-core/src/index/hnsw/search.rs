//! HNSW search: bounded best-first layer expansion and the public query
//! entry point.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::index::ordered_float::OrderedFloat;
use crate::index::visited::{VisitedScratch, SEARCH_SCRATCH};
use crate::VectorId;

use super::{vector_of, HnswIndex, Node};

impl HnswIndex {
    /// Best-first search within one layer.
    ///
    /// Maintains a candidate min-heap and a bounded result max-heap, both
    /// keyed by distance to `query`. Expansion stops when the closest
    /// unexpanded candidate is worse than the worst retained result and
    /// the result heap holds `ef` items. Neighbor lists are snapshotted
    /// under the owning node's mutex, so traversal sees each adjacency in
    /// a consistent state even while builders run.
    ///
    /// Returns `(id, distance)` pairs sorted ascending.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn search_layer_inner(
        &self,
        vectors: &[f32],
        nodes: &[Node],
        query: &[f32],
        entry: VectorId,
        ef: usize,
        layer: usize,
        scratch: &mut VisitedScratch,
        count_stats: bool,
    ) -> Vec<(VectorId, f32)> {
        if nodes.is_empty() {
            return Vec::new();
        }

        scratch.begin(nodes.len());

        let mut candidates: BinaryHeap<Reverse<(OrderedFloat, VectorId)>> = BinaryHeap::new();
        let mut results: BinaryHeap<(OrderedFloat, VectorId)> = BinaryHeap::new();

        let entry_dist =
            self.query_distance(query, vector_of(vectors, self.dim, entry), count_stats);
        candidates.push(Reverse((OrderedFloat(entry_dist), entry)));
        results.push((OrderedFloat(entry_dist), entry));
        scratch.insert(entry);

        while let Some(Reverse((OrderedFloat(dist), node))) = candidates.pop() {
            let worst = results.peek().map_or(f32::INFINITY, |r| r.0 .0);
            if dist > worst && results.len() >= ef {
                break;
            }

            // Snapshot the adjacency under the node's mutex; distances are
            // computed after the lock is released.
            let neighbors: Vec<VectorId> = {
                let layers = nodes[node as usize].layers.lock();
                layers.get(layer).cloned().unwrap_or_default()
            };

            for nb in neighbors {
                if !scratch.insert(nb) {
                    continue;
                }
                let d = self.query_distance(query, vector_of(vectors, self.dim, nb), count_stats);
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

    /// Searches for the `k` nearest neighbors of `query`.
    ///
    /// Greedy beam-1 descent from the entry point through the upper
    /// layers, then a bounded best-first search with `ef_search` at layer
    /// 0. Returns up to `k` ids in ascending distance order; an empty
    /// index yields an empty result.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<VectorId> {
        let vectors = self.vectors.read();
        let nodes = self.nodes.read();
        if nodes.is_empty() {
            return Vec::new();
        }

        let (entry_point, max_layer) = {
            let entry = self.entry.lock();
            (entry.entry_point, entry.max_layer)
        };
        let Some(mut ep) = entry_point else {
            return Vec::new();
        };

        SEARCH_SCRATCH.with(|cell| {
            let mut scratch = cell.borrow_mut();

            for layer in (1..=max_layer).rev() {
                let res =
                    self.search_layer_inner(&vectors, &nodes, query, ep, 1, layer, &mut scratch, true);
                if let Some(&(best, _)) = res.first() {
                    ep = best;
                }
            }

            let res0 = self.search_layer_inner(
                &vectors,
                &nodes,
                query,
                ep,
                ef_search,
                0,
                &mut scratch,
                true,
            );
            res0.into_iter().take(k).map(|(id, _)| id).collect()
        })
    }
}
