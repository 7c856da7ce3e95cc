//! SIMD-accelerated vector kernels using the `wide` crate.
//!
//! Every kernel processes 8 `f32` lanes per iteration with fused
//! multiply-add and finishes the tail with scalar code. The `_scalar`
//! variants are the reference implementations; the SIMD and scalar paths
//! must agree to within 1 ULP for inputs whose components are in
//! `[-10, 10]`.
//!
//! The `wide` crate lowers `f32x8` to AVX2/SSE on `x86_64`, NEON on
//! `aarch64`, and plain scalar code elsewhere, so there is no runtime
//! feature dispatch here.

use wide::f32x8;

const LANES: usize = 8;

/// Computes the squared L2 (Euclidean) distance between two vectors.
///
/// # Panics
///
/// Panics if the slices have different lengths.
#[inline]
#[must_use]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vector dimensions must match");

    let chunks = a.len() / LANES;
    let mut acc = f32x8::ZERO;

    for i in 0..chunks {
        let offset = i * LANES;
        let va = f32x8::from(&a[offset..offset + LANES]);
        let vb = f32x8::from(&b[offset..offset + LANES]);
        let diff = va - vb;
        acc = diff.mul_add(diff, acc);
    }

    let mut sum = acc.reduce_add();

    let base = chunks * LANES;
    for i in base..a.len() {
        let diff = a[i] - b[i];
        sum += diff * diff;
    }

    sum
}

/// Computes the dot product of two vectors.
///
/// # Panics
///
/// Panics if the slices have different lengths.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vector dimensions must match");

    let chunks = a.len() / LANES;
    let mut acc = f32x8::ZERO;

    for i in 0..chunks {
        let offset = i * LANES;
        let va = f32x8::from(&a[offset..offset + LANES]);
        let vb = f32x8::from(&b[offset..offset + LANES]);
        acc = va.mul_add(vb, acc);
    }

    let mut sum = acc.reduce_add();

    let base = chunks * LANES;
    for i in base..a.len() {
        sum += a[i] * b[i];
    }

    sum
}

/// Scalar reference implementation of [`l2_squared`].
#[inline]
#[must_use]
pub fn l2_squared_scalar(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vector dimensions must match");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Scalar reference implementation of [`dot`].
#[inline]
#[must_use]
pub fn dot_scalar(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vector dimensions must match");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
