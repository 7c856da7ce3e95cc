//! File-backed storage for fixed-dimension vectors.
//!
//! Vectors live in a flat binary file at slot offset `id * dim * 4`. Every
//! read and write opens its own handle, seeks, performs the I/O, accounts
//! stats, and drops the handle. Concurrent readers are safe because each
//! uses an independent handle; concurrent writers are not coordinated.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use parking_lot::Mutex;

use super::{IoStats, StorageBackend};
use crate::{Error, Result, VectorData, VectorId};

/// Flat-file storage backend with a fixed per-vector stride.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    dim: usize,
    stats: Mutex<IoStats>,
}

impl FileBackend {
    /// Creates a file backend over `path` for vectors of length `dim`.
    ///
    /// The file is created lazily on the first write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when `dim` is zero.
    pub fn new<P: AsRef<Path>>(path: P, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig(
                "file backend dimension must be positive".to_string(),
            ));
        }
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            dim,
            stats: Mutex::new(IoStats::default()),
        })
    }

    /// Vector dimension this backend stores.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn slot_bytes(&self) -> u64 {
        (self.dim * std::mem::size_of::<f32>()) as u64
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, id: VectorId) -> Result<Option<VectorData>> {
        let start = Instant::now();

        let mut file = match OpenOptions::new().read(true).open(&self.path) {
            Ok(f) => f,
            // A missing backing file means nothing was ever written.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let offset = id
            .checked_mul(self.slot_bytes())
            .ok_or_else(|| Error::Storage(format!("slot offset overflows for id {id}")))?;

        // A slot past the end of the file was never written.
        let file_len = file.metadata()?.len();
        if offset + self.slot_bytes() > file_len {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; self.dim * std::mem::size_of::<f32>()];
        file.read_exact(&mut buf)?;

        let out: VectorData = buf
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        let elapsed_us = start.elapsed().as_secs_f64() * 1e6;
        let mut stats = self.stats.lock();
        stats.num_reads += 1;
        stats.bytes_read += self.slot_bytes();
        stats.total_read_latency_us += elapsed_us;

        Ok(Some(out))
    }

    fn write(&self, id: VectorId, data: &[f32]) -> Result<()> {
        if data.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: data.len(),
            });
        }

        let start = Instant::now();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let offset = id
            .checked_mul(self.slot_bytes())
            .ok_or_else(|| Error::Storage(format!("slot offset overflows for id {id}")))?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = Vec::with_capacity(data.len() * std::mem::size_of::<f32>());
        for &v in data {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        file.write_all(&buf)?;
        file.flush()?;

        let elapsed_us = start.elapsed().as_secs_f64() * 1e6;
        let mut stats = self.stats.lock();
        stats.num_writes += 1;
        stats.bytes_written += self.slot_bytes();
        stats.total_write_latency_us += elapsed_us;

        Ok(())
    }

    fn stats(&self) -> IoStats {
        *self.stats.lock()
    }

    fn reset_stats(&self) {
        *self.stats.lock() = IoStats::default();
    }
}
