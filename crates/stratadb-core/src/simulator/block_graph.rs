//! Block graph for the ANN-in-SSD model: vector placement, centroids, and
//! portal adjacency.

use crate::dataset::Dataset;
use crate::simd;
use crate::VectorId;

use super::config::{AnnInSsdConfig, PlacementMode};

/// Identifier of a block in the simulator's block table.
pub type BlockId = usize;

/// Precomputed block-level metadata for graph navigation.
///
/// Built lazily on the first query and reused while the shape parameters
/// (`dim`, `vectors_per_block`, block count) are unchanged.
pub(super) struct BlockGraph {
    pub(super) dim: usize,
    pub(super) vectors_per_block: usize,
    /// `assignment[b]` = ids owned by block `b`. Every id in the dataset
    /// view appears in exactly one block.
    pub(super) assignment: Vec<Vec<VectorId>>,
    /// Arithmetic-mean centroid per block; zeros for an empty block.
    pub(super) centroids: Vec<Vec<f32>>,
    /// Portal adjacency: `portal_degree` nearest blocks by centroid
    /// distance plus the ring backbone `b ± 1 mod B`.
    pub(super) neighbors: Vec<Vec<BlockId>>,
}

impl BlockGraph {
    /// True when this graph matches the shape the config asks for.
    pub(super) fn matches(&self, dim: usize, vectors_per_block: usize, num_blocks: usize) -> bool {
        self.dim == dim
            && self.vectors_per_block == vectors_per_block
            && self.assignment.len() == num_blocks
            && self.centroids.len() == num_blocks
            && self.neighbors.len() == num_blocks
    }

    /// Builds the block graph over the first `n` vectors of `dataset`.
    pub(super) fn build(config: &AnnInSsdConfig, dataset: &Dataset, n: usize, dim: usize) -> Self {
        let vectors_per_block = config.effective_vectors_per_block();
        let num_blocks = n.div_ceil(vectors_per_block);

        let assignment = match config.placement_mode {
            PlacementMode::HashHome => hash_home_assignment(n, vectors_per_block, num_blocks),
            PlacementMode::LocalityAware => locality_aware_assignment(dataset, n, dim, num_blocks),
        };

        let centroids = compute_centroids(dataset, &assignment, dim);
        let neighbors =
            portal_adjacency(&centroids, dim, config.effective_portal_degree(), num_blocks);

        Self {
            dim,
            vectors_per_block,
            assignment,
            centroids,
            neighbors,
        }
    }
}

/// Contiguous id ranges: block `b` owns `[b*K, min((b+1)*K, n))`.
fn hash_home_assignment(n: usize, k: usize, num_blocks: usize) -> Vec<Vec<VectorId>> {
    (0..num_blocks)
        .map(|b| {
            let start = b * k;
            let end = ((b + 1) * k).min(n);
            (start..end).map(|i| i as VectorId).collect()
        })
        .collect()
}

/// One-pass nearest-centroid clustering.
///
/// Centroids seed from a deterministic stride over the dataset, then every
/// vector joins its nearest seed. Blocks come out imbalanced; the model
/// accepts that as the realistic outcome of single-pass clustering.
fn locality_aware_assignment(
    dataset: &Dataset,
    n: usize,
    dim: usize,
    num_blocks: usize,
) -> Vec<Vec<VectorId>> {
    let mut assignment = vec![Vec::new(); num_blocks];
    if num_blocks == 0 {
        return assignment;
    }

    let seeds: Vec<&[f32]> = (0..num_blocks)
        .map(|b| {
            let idx = (b * (n / num_blocks)) % n;
            dataset.vector(idx)
        })
        .collect();

    for i in 0..n {
        let vec = dataset.vector(i);
        if vec.len() != dim {
            continue;
        }
        let mut best_dist = f32::INFINITY;
        let mut best_block = 0;
        for (b, seed) in seeds.iter().enumerate() {
            let d = simd::l2_squared(vec, seed);
            if d < best_dist {
                best_dist = d;
                best_block = b;
            }
        }
        assignment[best_block].push(i as VectorId);
    }

    assignment
}

/// Arithmetic mean of each block's vectors; zeros for empty blocks.
fn compute_centroids(dataset: &Dataset, assignment: &[Vec<VectorId>], dim: usize) -> Vec<Vec<f32>> {
    assignment
        .iter()
        .map(|ids| {
            let mut centroid = vec![0.0f32; dim];
            let mut count = 0usize;
            for &id in ids {
                let vec = dataset.vector(id as usize);
                if vec.len() != dim {
                    continue;
                }
                for (c, v) in centroid.iter_mut().zip(vec) {
                    *c += v;
                }
                count += 1;
            }
            if count > 0 {
                #[allow(clippy::cast_precision_loss)]
                let inv = 1.0 / count as f32;
                for c in &mut centroid {
                    *c *= inv;
                }
            }
            centroid
        })
        .collect()
}

/// Centroid-KNN portals (partial select, then sort ascending) plus the
/// ring backbone `b ± 1 mod B` for global connectivity even when the
/// portal degree is tiny.
fn portal_adjacency(
    centroids: &[Vec<f32>],
    dim: usize,
    portal_degree: usize,
    num_blocks: usize,
) -> Vec<Vec<BlockId>> {
    let mut neighbors = vec![Vec::new(); num_blocks];

    for b in 0..num_blocks {
        let own = &centroids[b];
        if own.len() != dim {
            continue;
        }

        let mut cand: Vec<(f32, BlockId)> = (0..num_blocks)
            .filter(|&j| j != b)
            .map(|j| (simd::l2_squared(own, &centroids[j]), j))
            .collect();

        let keep = portal_degree.min(cand.len());
        let list = &mut neighbors[b];
        if keep > 0 {
            cand.select_nth_unstable_by(keep - 1, |a, c| a.0.total_cmp(&c.0));
            cand.truncate(keep);
            cand.sort_by(|a, c| a.0.total_cmp(&c.0));
            list.extend(cand.into_iter().map(|(_, j)| j));
        }

        if num_blocks > 1 {
            let forward = (b + 1) % num_blocks;
            if !list.contains(&forward) {
                list.push(forward);
            }
            let backward = (b + num_blocks - 1) % num_blocks;
            if !list.contains(&backward) {
                list.push(backward);
            }
        }
    }

    neighbors
}
