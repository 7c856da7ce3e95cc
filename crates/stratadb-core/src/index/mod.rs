//! Approximate-nearest-neighbor indexes.
//!
//! Two variants share one graph algorithm and differ only in where the
//! vector payloads live:
//!
//! - [`HnswIndex`]: payloads in a contiguous DRAM arena owned by the index.
//! - [`TieredHnswIndex`]: payloads resolved through a
//!   [`crate::StorageBackend`] on every access.

use std::path::Path;

pub mod hnsw;
pub mod tiered;

pub(crate) mod codec;
pub(crate) mod ordered_float;
pub(crate) mod visited;

pub use hnsw::HnswIndex;
pub use tiered::TieredHnswIndex;

use crate::{Result, VectorData, VectorId};

/// Common surface of the ANN index variants.
pub trait AnnIndex: Send + Sync {
    /// Builds the index over `data` serially. Ids are assigned `0..N-1` in
    /// input order. Any previous contents are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DimensionMismatch`] when a row does not
    /// match the index dimension, or a storage error from the payload tier.
    fn build(&self, data: &[VectorData]) -> Result<()>;

    /// Builds the index with `num_threads` workers. Adjacency depends on
    /// thread interleaving; recall is comparable to a serial build.
    ///
    /// # Errors
    ///
    /// Same conditions as [`AnnIndex::build`].
    fn build_parallel(&self, data: &[VectorData], num_threads: usize) -> Result<()>;

    /// Returns up to `k` ids in ascending distance order. An empty index
    /// yields an empty result.
    fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<VectorId>;

    /// Persists the index to `path` in the fixed little-endian format.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be written.
    fn save(&self, path: &Path) -> Result<()>;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// True when nothing has been indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension this index was created with.
    fn dimension(&self) -> usize;
}
