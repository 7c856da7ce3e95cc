//! End-to-end HNSW scenarios: the 2D line dataset, persistence identity,
//! parallel-build equivalence, and the ef-monotonicity property.

use std::collections::HashSet;
use std::sync::Arc;

use stratadb_core::{
    CachePolicyKind, Dataset, DistanceMetric, HnswIndex, MemoryBackend, StorageBackend,
    TieredBackend, TieredHnswIndex, VectorId,
};

#[allow(clippy::cast_precision_loss)]
fn line_data(n: usize) -> Vec<Vec<f32>> {
    (0..n).map(|i| vec![i as f32, 0.0]).collect()
}

/// 2D line: every indexed point is its own nearest neighbor.
#[test]
fn line_self_search_serial() {
    let index = HnswIndex::new(2, 4, 50, DistanceMetric::L2);
    index.build(&line_data(10)).unwrap();

    #[allow(clippy::cast_precision_loss)]
    for i in 0..10u64 {
        let result = index.search(&[i as f32, 0.0], 1, 10);
        assert_eq!(result, vec![i], "self-search failed for point {i}");
    }
}

/// Save/load identity: the loaded index answers the line queries exactly
/// like the original.
#[test]
fn save_load_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("line.hnsw");

    let index = HnswIndex::new(2, 4, 50, DistanceMetric::L2);
    index.build(&line_data(10)).unwrap();
    index.save(&path).unwrap();

    let loaded = HnswIndex::load(&path).unwrap();
    #[allow(clippy::cast_precision_loss)]
    for i in 0..10u64 {
        let result = loaded.search(&[i as f32, 0.0], 1, 10);
        assert_eq!(result, vec![i], "loaded-index search failed for {i}");
    }

    let (graph_a, entry_a, max_a) = index.export_graph();
    let (graph_b, entry_b, max_b) = loaded.export_graph();
    assert_eq!(graph_a, graph_b, "adjacency must survive the round trip");
    assert_eq!(entry_a, entry_b);
    assert_eq!(max_a, max_b);
}

fn assert_degree_caps(index: &HnswIndex) {
    let (graph, _, _) = index.export_graph();
    for (id, layers) in graph.iter().enumerate() {
        for (layer, list) in layers.iter().enumerate() {
            let cap = if layer == 0 { index.m() * 2 } else { index.m() };
            assert!(
                list.len() <= cap,
                "node {id} layer {layer}: degree {} over cap {cap}",
                list.len()
            );
        }
    }
}

/// Parallel-build equivalence: serial and 4-thread builds both answer the
/// line self-queries and both honor the degree caps. Absolute adjacency
/// equality is not required.
#[test]
fn parallel_build_equivalence() {
    let data = line_data(10);

    let serial = HnswIndex::new(2, 4, 50, DistanceMetric::L2);
    serial.build(&data).unwrap();

    let parallel = HnswIndex::new(2, 4, 50, DistanceMetric::L2);
    parallel.build_parallel(&data, 4).unwrap();

    #[allow(clippy::cast_precision_loss)]
    for i in 0..10u64 {
        let q = vec![i as f32, 0.0];
        assert_eq!(serial.search(&q, 1, 10), vec![i]);
        assert_eq!(parallel.search(&q, 1, 10), vec![i]);
    }

    assert_degree_caps(&serial);
    assert_degree_caps(&parallel);
}

/// Recall against brute force is monotone (within statistical tolerance)
/// in `ef_search`: the bigger beam wins or ties on at least 95% of
/// queries.
#[test]
fn search_monotone_in_ef() {
    let dataset = Dataset::generate_gaussian(500, 16, 9);
    let index = HnswIndex::new(16, 8, 100, DistanceMetric::L2);
    index.build(dataset.vectors()).unwrap();

    let queries: Vec<Vec<f32>> = (0..100).map(|i| dataset.vector(i * 5).to_vec()).collect();
    let truth = dataset.compute_ground_truth(&queries, 10, DistanceMetric::L2);

    let recall = |found: &[VectorId], truth: &[VectorId]| -> f64 {
        let truth_set: HashSet<VectorId> = truth.iter().copied().collect();
        #[allow(clippy::cast_precision_loss)]
        {
            found.iter().filter(|id| truth_set.contains(id)).count() as f64 / truth.len() as f64
        }
    };

    let mut improved_or_tied = 0usize;
    for (query, truth_row) in queries.iter().zip(&truth) {
        let small = index.search(query, 10, 20);
        let large = index.search(query, 10, 200);
        if recall(&large, truth_row) >= recall(&small, truth_row) {
            improved_or_tied += 1;
        }
    }
    assert!(
        improved_or_tied >= 95,
        "larger ef regressed recall on {} of 100 queries",
        100 - improved_or_tied
    );
}

/// Self-search succeeds for at least 99% of indexed Gaussian vectors.
#[test]
fn self_search_recall_on_gaussian() {
    let dataset = Dataset::generate_gaussian(300, 8, 3);
    let index = HnswIndex::new(8, 8, 100, DistanceMetric::L2);
    index.build(dataset.vectors()).unwrap();

    let mut correct = 0usize;
    for i in 0..dataset.len() {
        let result = index.search(dataset.vector(i), 1, 50);
        if result.first() == Some(&(i as VectorId)) {
            correct += 1;
        }
    }
    assert!(
        correct >= 297,
        "self-search succeeded on only {correct}/300 vectors"
    );
}

/// The tiered index over a cache-fronted backend answers the line
/// queries and charges its reads to the tier.
#[test]
fn tiered_line_scenario() {
    let backing = Arc::new(MemoryBackend::new(2));
    let tier = Arc::new(TieredBackend::new(backing, 8, CachePolicyKind::Lru));
    let index = TieredHnswIndex::new(2, tier.clone(), 4, 50, DistanceMetric::L2);
    index.build(&line_data(10)).unwrap();

    tier.reset_stats();
    #[allow(clippy::cast_precision_loss)]
    for i in 0..10u64 {
        let result = index.search(&[i as f32, 0.0], 1, 10);
        assert_eq!(result, vec![i]);
    }
    assert!(
        tier.cache_hits() + tier.cache_misses() > 0,
        "tiered searches must be served through the cache tier"
    );
}
