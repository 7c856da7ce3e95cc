//! Ordered float wrapper for use in `BinaryHeap`.
//!
//! Uses `f32::total_cmp`, which defines the IEEE 754 total order
//! `-NaN < -inf < ... < -0 < +0 < ... < +inf < +NaN`, so `Ord`/`Eq` stay
//! consistent even if a NaN distance ever reaches a heap.

use std::cmp::Ordering;

/// Wrapper giving `f32` a total order for heap use.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OrderedFloat(pub f32);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for OrderedFloat {}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
