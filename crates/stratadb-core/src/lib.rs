//! # `StrataDB` Core
//!
//! Vector-search research core in Rust.
//!
//! `StrataDB` studies where approximate-nearest-neighbor indexes should keep
//! their vector payloads. It provides three subsystems that share one data
//! model:
//!
//! - **HNSW index** ([`HnswIndex`]): a DRAM-resident hierarchical navigable
//!   small-world graph with serial and lock-striped parallel construction.
//! - **Tiered index** ([`TieredHnswIndex`]): the same graph with payloads
//!   resolved through a pluggable [`StorageBackend`], typically a
//!   [`TieredBackend`] that fronts a backing store with a bounded cache and
//!   an optional SSD timing model.
//! - **ANN-in-SSD simulator** ([`AnnInSsdModel`]): an analytic block-graph
//!   navigator that estimates recall, latency, and device service time for
//!   in-storage search designs.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stratadb_core::{Dataset, DistanceMetric, HnswIndex};
//!
//! let data = Dataset::generate_gaussian(10_000, 128, 42);
//! let index = HnswIndex::new(128, 16, 200, DistanceMetric::L2);
//! index.build_parallel(data.vectors(), 8)?;
//!
//! let neighbors = index.search(data.vector(0), 10, 100);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod index;
pub mod metrics;
pub mod simd;
pub mod simulator;
pub mod storage;

#[cfg(test)]
mod simd_tests;

pub use cache::{CachePolicy, CachePolicyKind, LfuPolicy, LruPolicy};
pub use dataset::Dataset;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use index::{AnnIndex, HnswIndex, TieredHnswIndex};
pub use simulator::{AnnInSsdConfig, AnnInSsdModel, SimulationSummary, SsdDeviceConfig, SsdSimulator};
pub use storage::{FileBackend, IoStats, MemoryBackend, StorageBackend, TieredBackend};

/// Identifier for a vector. Dense, assigned `0..N-1` at index-build time and
/// stable for the life of an index.
pub type VectorId = u64;

/// Dense vector payload of a fixed per-index dimension.
pub type VectorData = Vec<f32>;
