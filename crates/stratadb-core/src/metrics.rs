//! Evaluation metrics for retrieval quality.
//!
//! Used by the benchmark harnesses and tests to score index results
//! against brute-force ground truth.

use rustc_hash::FxHashSet;

use crate::VectorId;

/// Recall@k: fraction of the true k nearest neighbors present among the
/// retrieved results. The denominator is `k` even when fewer results were
/// retrieved, so truncated result lists lose recall.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn recall_at_k(ground_truth: &[VectorId], retrieved: &[VectorId], k: usize) -> f32 {
    if k == 0 {
        return 0.0;
    }
    let truth: FxHashSet<VectorId> = ground_truth.iter().take(k).copied().collect();
    let hits = retrieved
        .iter()
        .take(k)
        .filter(|id| truth.contains(id))
        .count();
    hits as f32 / k as f32
}

/// Precision@k: fraction of the retrieved results (up to `k`) that appear
/// anywhere in the ground truth.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn precision_at_k(ground_truth: &[VectorId], retrieved: &[VectorId], k: usize) -> f32 {
    let considered = k.min(retrieved.len());
    if considered == 0 {
        return 0.0;
    }
    let truth: FxHashSet<VectorId> = ground_truth.iter().copied().collect();
    let hits = retrieved
        .iter()
        .take(considered)
        .filter(|id| truth.contains(id))
        .count();
    hits as f32 / considered as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recall_perfect() {
        let truth = vec![1, 2, 3, 4, 5];
        let retrieved = vec![5, 4, 3, 2, 1];
        assert!((recall_at_k(&truth, &retrieved, 5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_recall_partial() {
        let truth = vec![1, 2, 3, 4];
        let retrieved = vec![1, 2, 9, 10];
        assert!((recall_at_k(&truth, &retrieved, 4) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_recall_counts_only_top_k_truth() {
        // 9 is in the truth list but beyond k=2, so finding it scores
        // nothing.
        let truth = vec![1, 2, 9];
        let retrieved = vec![9, 1];
        assert!((recall_at_k(&truth, &retrieved, 2) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_recall_truncated_results_lose() {
        let truth = vec![1, 2, 3, 4];
        let retrieved = vec![1];
        assert!((recall_at_k(&truth, &retrieved, 4) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_precision_denominator_is_retrieved() {
        // One of two retrieved is relevant: precision 0.5 regardless of k.
        let truth = vec![1, 2, 3, 4];
        let retrieved = vec![1, 42];
        assert!((precision_at_k(&truth, &retrieved, 10) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(recall_at_k(&[], &[], 0), 0.0);
        assert_eq!(recall_at_k(&[1], &[], 5), 0.0);
        assert_eq!(precision_at_k(&[1], &[], 5), 0.0);
    }
}
