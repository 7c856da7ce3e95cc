//! Distance metrics for vector similarity calculations.
//!
//! All metrics are "smaller is better": L2 reports the squared Euclidean
//! distance, the similarity metrics report negated similarity. A single
//! ordering discipline lets every search structure in the crate use one
//! comparison direction.

use serde::{Deserialize, Serialize};

use crate::simd;

/// Guards the cosine denominator against zero-norm inputs.
const COSINE_EPSILON: f32 = 1e-8;

/// Distance metric for vector similarity calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance.
    /// Best for spatial data and when magnitude matters.
    #[default]
    L2,

    /// Negated inner product (for maximum inner product search).
    InnerProduct,

    /// Negated cosine similarity.
    /// Best for normalized vectors, commonly used with text embeddings.
    Cosine,
}

impl DistanceMetric {
    /// Calculates the distance between two vectors using this metric.
    ///
    /// Smaller results always mean "closer".
    ///
    /// # Panics
    ///
    /// Panics if the vectors have different dimensions.
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => simd::l2_squared(a, b),
            Self::InnerProduct => -simd::dot(a, b),
            Self::Cosine => -cosine_similarity(a, b),
        }
    }

    /// Stable numeric tag used by the binary index format.
    #[must_use]
    pub const fn tag(self) -> i32 {
        match self {
            Self::L2 => 0,
            Self::InnerProduct => 1,
            Self::Cosine => 2,
        }
    }

    /// Inverse of [`DistanceMetric::tag`]; `None` for unknown tags.
    #[must_use]
    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::L2),
            1 => Some(Self::InnerProduct),
            2 => Some(Self::Cosine),
            _ => None,
        }
    }
}

/// Cosine similarity between two vectors.
///
/// The denominator carries a small epsilon so zero vectors produce a finite
/// result instead of dividing by zero.
#[inline]
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = simd::dot(a, b);
    let norm_a = simd::dot(a, a).sqrt();
    let norm_b = simd::dot(b, b).sqrt();
    dot / (norm_a * norm_b + COSINE_EPSILON)
}
