//! In-memory storage backend.

use parking_lot::Mutex;

use super::{IoStats, StorageBackend};
use crate::{Error, Result, VectorData, VectorId};

struct MemoryInner {
    /// Dense slot array; index = id.
    data: Vec<VectorData>,
    /// Presence bit per slot; a slot can exist without ever being written.
    present: Vec<bool>,
    stats: IoStats,
}

/// In-memory storage backend using a dense slot array.
///
/// Assumes ids are small integers and grows the slot array as needed. A
/// single mutex serializes mutation and stats; reads copy the payload
/// under the lock so callers never alias live internal buffers.
pub struct MemoryBackend {
    dim: usize,
    inner: Mutex<MemoryInner>,
}

impl MemoryBackend {
    /// Creates an empty in-memory backend for vectors of length `dim`.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            inner: Mutex::new(MemoryInner {
                data: Vec::new(),
                present: Vec::new(),
                stats: IoStats::default(),
            }),
        }
    }

    /// Vector dimension this backend stores.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Number of slots currently allocated (not all need be present).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().data.len()
    }

    /// True when no slot has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, id: VectorId) -> Result<Option<VectorData>> {
        let mut inner = self.inner.lock();
        let idx = usize::try_from(id).map_err(|_| Error::Storage(format!("id {id} overflows")))?;
        if idx >= inner.data.len() || !inner.present[idx] {
            return Ok(None);
        }
        let out = inner.data[idx].clone();
        inner.stats.num_reads += 1;
        inner.stats.bytes_read += (out.len() * std::mem::size_of::<f32>()) as u64;
        Ok(Some(out))
    }

    fn write(&self, id: VectorId, data: &[f32]) -> Result<()> {
        if data.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: data.len(),
            });
        }

        let mut inner = self.inner.lock();
        let idx = usize::try_from(id).map_err(|_| Error::Storage(format!("id {id} overflows")))?;
        if inner.data.len() <= idx {
            inner.data.resize_with(idx + 1, Vec::new);
            inner.present.resize(idx + 1, false);
        }
        inner.data[idx] = data.to_vec();
        inner.present[idx] = true;
        inner.stats.num_writes += 1;
        inner.stats.bytes_written += (data.len() * std::mem::size_of::<f32>()) as u64;
        Ok(())
    }

    fn stats(&self) -> IoStats {
        self.inner.lock().stats
    }

    fn reset_stats(&self) {
        self.inner.lock().stats = IoStats::default();
    }
}
