//! Tests for the `simd` module.

use super::simd::*;

fn ramp(dim: usize, scale: f32, offset: f32) -> Vec<f32> {
    // Deterministic values confined to [-10, 10].
    (0..dim)
        .map(|i| {
            let x = (i % 21) as f32 - 10.0;
            (x * scale + offset).clamp(-10.0, 10.0)
        })
        .collect()
}

#[test]
fn test_l2_squared_basic() {
    let a = [0.0_f32, 0.0, 0.0];
    let b = [3.0_f32, 4.0, 0.0];
    assert!((l2_squared(&a, &b) - 25.0).abs() < 1e-6);
}

#[test]
fn test_dot_basic() {
    let a = [1.0_f32, 2.0, 3.0];
    let b = [4.0_f32, 5.0, 6.0];
    assert!((dot(&a, &b) - 32.0).abs() < 1e-6);
}

#[test]
fn test_l2_squared_zero_for_identical() {
    let a = ramp(128, 0.7, 0.3);
    assert_eq!(l2_squared(&a, &a), 0.0);
}

#[test]
fn test_simd_matches_scalar_l2() {
    // Exercise dims around the 8-lane boundary plus larger sizes.
    for dim in [1, 3, 7, 8, 9, 15, 16, 31, 64, 128, 257] {
        let a = ramp(dim, 0.9, 0.1);
        let b = ramp(dim, -0.6, 0.4);
        let simd = l2_squared(&a, &b);
        let scalar = l2_squared_scalar(&a, &b);
        let tol = scalar.abs().max(1.0) * 1e-6;
        assert!(
            (simd - scalar).abs() <= tol,
            "dim {dim}: simd {simd} vs scalar {scalar}"
        );
    }
}

#[test]
fn test_simd_matches_scalar_dot() {
    for dim in [1, 4, 8, 12, 16, 33, 100, 768] {
        let a = ramp(dim, 0.8, -0.2);
        let b = ramp(dim, 0.5, 0.6);
        let simd = dot(&a, &b);
        let scalar = dot_scalar(&a, &b);
        let tol = scalar.abs().max(1.0) * 1e-6;
        assert!(
            (simd - scalar).abs() <= tol,
            "dim {dim}: simd {simd} vs scalar {scalar}"
        );
    }
}

#[test]
#[should_panic(expected = "vector dimensions must match")]
fn test_dimension_mismatch_panics() {
    let a = [1.0_f32, 2.0];
    let b = [1.0_f32, 2.0, 3.0];
    let _ = dot(&a, &b);
}
