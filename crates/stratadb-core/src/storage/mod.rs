//! Storage backends for vector payloads.
//!
//! The index layer reads and writes fixed-dimension payloads by id through
//! the [`StorageBackend`] trait. Absent ids are not errors: `read` returns
//! `Ok(None)` so callers can treat a miss as "skip", while real I/O
//! failures propagate as [`crate::Error`].
//!
//! # Implementations
//!
//! - [`MemoryBackend`]: dense DRAM storage behind a single mutex.
//! - [`FileBackend`]: a fixed-stride flat binary file, one handle per call.
//! - [`TieredBackend`]: a bounded cache in front of a backing store, with
//!   hit/miss accounting and an optional SSD device-timing model.

mod file;
mod io_stats;
mod memory;
mod tiered;


pub use file::FileBackend;
pub use io_stats::IoStats;
pub use memory::MemoryBackend;
pub use tiered::TieredBackend;

use crate::{Result, VectorData, VectorId};

/// Storage for fixed-dimension vector payloads, addressed by id.
///
/// Payloads written during an index build are immutable for the life of
/// that index: implementations must not be used to overwrite a slot
/// in-place while a build is running, because graph construction reads
/// payloads without holding any storage lock.
pub trait StorageBackend: Send + Sync {
    /// Reads the payload previously written for `id`.
    ///
    /// Returns `Ok(None)` when nothing was written for `id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying I/O fails; failed reads are
    /// accounted as attempts only, never as completed reads.
    fn read(&self, id: VectorId) -> Result<Option<VectorData>>;

    /// Writes (creates or overwrites) the payload for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DimensionMismatch`] when `data` does not
    /// match the backend's dimension, or an I/O error from the underlying
    /// store.
    fn write(&self, id: VectorId, data: &[f32]) -> Result<()>;

    /// Reads a batch of ids; the result has the same length as `ids` and
    /// each element carries [`StorageBackend::read`] semantics.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error encountered.
    fn batch_read(&self, ids: &[VectorId]) -> Result<Vec<Option<VectorData>>> {
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            out.push(self.read(id)?);
        }
        Ok(out)
    }

    /// Returns a snapshot of the accumulated I/O statistics.
    fn stats(&self) -> IoStats;

    /// Resets the I/O statistics to zero.
    fn reset_stats(&self);
}
