//! HNSW graph construction: layer assignment, neighbor selection, and the
//! serial and parallel insert paths.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::distance::DistanceMetric;
use crate::index::visited::VisitedScratch;
use crate::{Error, Result, VectorData, VectorId};

use super::{vector_of, HnswIndex, Node};

/// Default seed for the per-thread level RNG. Builds are deterministic per
/// thread but not across thread interleavings.
const LAYER_RNG_SEED: u64 = 42;

/// Log build progress every this many inserts on large builds.
const PROGRESS_STEP: u64 = 100_000;

thread_local! {
    static LAYER_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::seed_from_u64(LAYER_RNG_SEED));
}

/// Draws a level from the geometric distribution with p = 0.5.
fn assign_layer() -> usize {
    LAYER_RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        let mut level = 0usize;
        while rng.random::<f32>() < 0.5 {
            level += 1;
        }
        level
    })
}

/// Heuristic neighbor selection.
///
/// Candidates are sorted by distance to the anchor ascending; a candidate
/// is accepted unless some already-accepted neighbor is closer to it than
/// the anchor is. When the diversity rule under-fills the result, the
/// remaining nearest candidates top it up in order.
pub(super) fn select_neighbors_heuristic(
    vectors: &[f32],
    dim: usize,
    metric: DistanceMetric,
    candidates: &[(VectorId, f32)],
    m: usize,
) -> Vec<VectorId> {
    if candidates.is_empty() || m == 0 {
        return Vec::new();
    }

    let mut sorted = candidates.to_vec();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let max_keep = m.min(sorted.len());
    let mut result: Vec<VectorId> = Vec::with_capacity(max_keep);

    for &(cid, dist_q_c) in &sorted {
        let cv = vector_of(vectors, dim, cid);
        let diverse = result.iter().all(|&sid| {
            let sv = vector_of(vectors, dim, sid);
            metric.distance(sv, cv) >= dist_q_c
        });
        if diverse {
            result.push(cid);
            if result.len() >= max_keep {
                break;
            }
        }
    }

    if result.len() < max_keep {
        for &(cid, _) in &sorted {
            if result.len() >= max_keep {
                break;
            }
            if !result.contains(&cid) {
                result.push(cid);
            }
        }
    }

    result
}

impl HnswIndex {
    /// Validates `data` and resets the arena, node table, and entry state.
    fn reset_for_build(&self, data: &[VectorData]) -> Result<()> {
        for row in data {
            if row.len() != self.dim {
                return Err(Error::DimensionMismatch {
                    expected: self.dim,
                    actual: row.len(),
                });
            }
        }

        let mut vectors = self.vectors.write();
        vectors.clear();
        vectors.reserve(data.len() * self.dim);
        for row in data {
            vectors.extend_from_slice(row);
        }
        drop(vectors);

        let mut nodes = self.nodes.write();
        nodes.clear();
        nodes.resize_with(data.len(), Node::default);
        drop(nodes);

        *self.entry.lock() = super::EntryState::default();
        self.reset_search_stats();
        Ok(())
    }

    /// Builds the index serially; ids follow input order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] when a row does not match the
    /// index dimension.
    pub fn build(&self, data: &[VectorData]) -> Result<()> {
        let start = Instant::now();
        self.reset_for_build(data)?;

        let total = data.len() as u64;
        let mut scratch = VisitedScratch::default();
        let progress = Instant::now();

        for id in 0..total {
            self.insert_node(id, &mut scratch);
            if total >= PROGRESS_STEP && (id + 1) % PROGRESS_STEP == 0 {
                info!(
                    inserted = id + 1,
                    total,
                    elapsed_s = progress.elapsed().as_secs_f64(),
                    "hnsw build progress"
                );
            }
        }

        info!(
            num_vectors = total,
            elapsed_s = start.elapsed().as_secs_f64(),
            "hnsw build complete"
        );
        Ok(())
    }

    /// Builds the index with `num_threads` workers pulling ids from a
    /// shared atomic counter. The first node is inserted serially to
    /// establish the entry point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] when a row does not match the
    /// index dimension.
    pub fn build_parallel(&self, data: &[VectorData], num_threads: usize) -> Result<()> {
        if num_threads <= 1 {
            return self.build(data);
        }

        let start = Instant::now();
        self.reset_for_build(data)?;

        let total = data.len() as u64;
        if total == 0 {
            return Ok(());
        }

        let mut scratch = VisitedScratch::default();
        self.insert_node(0, &mut scratch);

        let next_id = AtomicU64::new(1);
        std::thread::scope(|scope| {
            for _ in 0..num_threads {
                scope.spawn(|| {
                    let mut scratch = VisitedScratch::default();
                    loop {
                        let id = next_id.fetch_add(1, Ordering::Relaxed);
                        if id >= total {
                            break;
                        }
                        self.insert_node(id, &mut scratch);
                    }
                });
            }
        });

        info!(
            num_vectors = total,
            num_threads,
            elapsed_s = start.elapsed().as_secs_f64(),
            "parallel hnsw build complete"
        );
        Ok(())
    }

    /// Inserts one node. Safe to call from multiple threads: adjacency is
    /// touched only under the owning node's mutex, one node at a time, and
    /// the global entry lock is never held together with a node mutex.
    fn insert_node(&self, id: VectorId, scratch: &mut VisitedScratch) {
        let level = assign_layer();

        let vectors = self.vectors.read();
        let nodes = self.nodes.read();
        let query = vector_of(&vectors, self.dim, id);

        {
            let mut layers = nodes[id as usize].layers.lock();
            if layers.len() < level + 1 {
                layers.resize(level + 1, Vec::new());
            }
        }

        // Claim the entry point when the graph is empty, otherwise read it.
        // One lock acquisition covers the check and the claim.
        let (mut ep, cur_max_layer) = {
            let mut entry = self.entry.lock();
            match entry.entry_point {
                None => {
                    entry.entry_point = Some(id);
                    entry.max_layer = level;
                    return;
                }
                Some(ep) => (ep, entry.max_layer),
            }
        };

        // Greedy descent with ef = 1 through the layers above this node's.
        if cur_max_layer > level {
            for layer in ((level + 1)..=cur_max_layer).rev() {
                let res =
                    self.search_layer_inner(&vectors, &nodes, query, ep, 1, layer, scratch, false);
                if let Some(&(best, _)) = res.first() {
                    ep = best;
                }
            }
        }

        // Search and connect on layers [min(max_layer, level) .. 0].
        let top_layer = cur_max_layer.min(level);
        for layer in (0..=top_layer).rev() {
            let candidates = self.search_layer_inner(
                &vectors,
                &nodes,
                query,
                ep,
                self.ef_construction,
                layer,
                scratch,
                false,
            );

            let cap = self.layer_cap(layer);
            let selected =
                select_neighbors_heuristic(&vectors, self.dim, self.metric, &candidates, cap);

            {
                let mut layers = nodes[id as usize].layers.lock();
                if layers.len() <= layer {
                    layers.resize(layer + 1, Vec::new());
                }
                let list = &mut layers[layer];
                for &nb in &selected {
                    if nb != id && !list.contains(&nb) {
                        list.push(nb);
                    }
                }
            }

            // Symmetric edges, one neighbor mutex at a time.
            for &nb in &selected {
                if nb == id {
                    continue;
                }
                let mut nb_layers = nodes[nb as usize].layers.lock();
                if nb_layers.len() <= layer {
                    nb_layers.resize(layer + 1, Vec::new());
                }
                let nb_list = &mut nb_layers[layer];
                if !nb_list.contains(&id) {
                    nb_list.push(id);
                }

                if nb_list.len() > cap {
                    // Re-select the neighbor's adjacency with it as anchor.
                    // Payload reads here need no lock: the arena is
                    // immutable during the build.
                    let anchor = vector_of(&vectors, self.dim, nb);
                    let cand: Vec<(VectorId, f32)> = nb_list
                        .iter()
                        .map(|&nid| {
                            let d = self
                                .metric
                                .distance(anchor, vector_of(&vectors, self.dim, nid));
                            (nid, d)
                        })
                        .collect();
                    *nb_list =
                        select_neighbors_heuristic(&vectors, self.dim, self.metric, &cand, cap);
                }
            }
        }

        // Promote to entry point when this node reached a new top layer.
        if level > cur_max_layer {
            let mut entry = self.entry.lock();
            if level > entry.max_layer {
                entry.max_layer = level;
                entry.entry_point = Some(id);
            }
        }
    }
}
