//! Dataset loading, generation, and ground-truth computation.
//!
//! Supports the classic ANN-benchmark file formats (`.fvecs`, `.bvecs`,
//! `.ivecs`, all little-endian) plus a seeded synthetic Gaussian
//! generator. Ground truth comes from a brute-force scan and exists to
//! score recall; it is an evaluation utility, not a search path.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::distance::DistanceMetric;
use crate::{Error, Result, VectorData, VectorId};

/// Synthetic data distribution for [`Dataset::generate_synthetic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyntheticDistribution {
    /// Standard normal per component.
    #[default]
    Gaussian,
    /// Uniform on `[0, 1)` per component.
    Uniform,
}

/// An in-memory dataset of fixed-dimension vectors.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    vectors: Vec<VectorData>,
    dim: usize,
}

impl Dataset {
    /// Loads a dataset, picking the format from the file extension
    /// (`.fvecs` or `.bvecs`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an unrecognized extension and
    /// the [`Dataset::load_fvecs`] / [`Dataset::load_bvecs`] conditions
    /// otherwise.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("fvecs") => Self::load_fvecs(path),
            Some("bvecs") => Self::load_bvecs(path),
            _ => Err(Error::InvalidConfig(format!(
                "unrecognized dataset extension in {}",
                path.display()
            ))),
        }
    }

    /// Wraps pre-existing vectors. Rows must share one dimension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] when rows disagree.
    pub fn from_vectors(vectors: Vec<VectorData>) -> Result<Self> {
        let dim = vectors.first().map_or(0, Vec::len);
        for row in &vectors {
            if row.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
        }
        Ok(Self { vectors, dim })
    }

    /// Loads an `.fvecs` file: records of `{i32 dim; f32[dim]}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDataset`] for non-positive or
    /// inconsistent dimensions or a truncated record, [`Error::Io`] for
    /// underlying I/O failures.
    pub fn load_fvecs<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut r = BufReader::new(file);

        let mut vectors = Vec::new();
        let mut dim = 0usize;

        while let Some(record_dim) = read_record_dim(&mut r)? {
            if dim == 0 {
                dim = record_dim;
            } else if record_dim != dim {
                return Err(Error::MalformedDataset(format!(
                    "fvecs record {} has dim {record_dim}, expected {dim}",
                    vectors.len()
                )));
            }
            let mut row = Vec::with_capacity(dim);
            for _ in 0..dim {
                row.push(f32::from_le_bytes(read_array(&mut r)?));
            }
            vectors.push(row);
        }

        info!(
            path = %path.as_ref().display(),
            num_vectors = vectors.len(),
            dim,
            "loaded fvecs dataset"
        );
        Ok(Self { vectors, dim })
    }

    /// Loads a `.bvecs` file: records of `{i32 dim; u8[dim]}`, promoted
    /// to `f32`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Dataset::load_fvecs`].
    pub fn load_bvecs<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut r = BufReader::new(file);

        let mut vectors = Vec::new();
        let mut dim = 0usize;

        while let Some(record_dim) = read_record_dim(&mut r)? {
            if dim == 0 {
                dim = record_dim;
            } else if record_dim != dim {
                return Err(Error::MalformedDataset(format!(
                    "bvecs record {} has dim {record_dim}, expected {dim}",
                    vectors.len()
                )));
            }
            let mut bytes = vec![0u8; dim];
            r.read_exact(&mut bytes).map_err(truncated)?;
            vectors.push(bytes.into_iter().map(f32::from).collect());
        }

        info!(
            path = %path.as_ref().display(),
            num_vectors = vectors.len(),
            dim,
            "loaded bvecs dataset"
        );
        Ok(Self { vectors, dim })
    }

    /// Generates `num` synthetic vectors of length `dim`,
    /// deterministically from `seed`.
    #[must_use]
    pub fn generate_synthetic(
        num: usize,
        dim: usize,
        distribution: SyntheticDistribution,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let vectors = (0..num)
            .map(|_| {
                (0..dim)
                    .map(|_| match distribution {
                        SyntheticDistribution::Gaussian => sample_standard_normal(&mut rng),
                        SyntheticDistribution::Uniform => rng.random::<f32>(),
                    })
                    .collect()
            })
            .collect();
        Self { vectors, dim }
    }

    /// Generates `num` standard-Gaussian vectors of length `dim`,
    /// deterministically from `seed` (Box-Muller over a seeded `StdRng`).
    #[must_use]
    pub fn generate_gaussian(num: usize, dim: usize, seed: u64) -> Self {
        Self::generate_synthetic(num, dim, SyntheticDistribution::Gaussian, seed)
    }

    /// Number of vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// True when the dataset holds no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Vector dimension; 0 for an empty dataset.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Borrows vector `idx`.
    ///
    /// # Panics
    ///
    /// Panics when `idx` is out of range.
    #[must_use]
    pub fn vector(&self, idx: usize) -> &[f32] {
        &self.vectors[idx]
    }

    /// Borrows all vectors.
    #[must_use]
    pub fn vectors(&self) -> &[VectorData] {
        &self.vectors
    }

    /// Brute-force k-nearest-neighbor ids for each query, ascending by
    /// distance under `metric`. Quadratic; an evaluation utility for
    /// recall scoring.
    #[must_use]
    pub fn compute_ground_truth(
        &self,
        queries: &[VectorData],
        k: usize,
        metric: DistanceMetric,
    ) -> Vec<Vec<VectorId>> {
        queries
            .iter()
            .map(|query| {
                let mut dist_id: Vec<(f32, VectorId)> = self
                    .vectors
                    .iter()
                    .enumerate()
                    .map(|(id, v)| (metric.distance(query, v), id as VectorId))
                    .collect();
                let kk = k.min(dist_id.len());
                if kk == 0 {
                    return Vec::new();
                }
                dist_id.select_nth_unstable_by(kk - 1, |a, b| a.0.total_cmp(&b.0));
                dist_id.truncate(kk);
                dist_id.sort_by(|a, b| a.0.total_cmp(&b.0));
                dist_id.into_iter().map(|(_, id)| id).collect()
            })
            .collect()
    }
}

/// Loads an `.ivecs` ground-truth file: records of `{i32 k; i32[k]}`.
///
/// # Errors
///
/// Returns [`Error::MalformedDataset`] for negative counts or ids and
/// truncated records, [`Error::Io`] for underlying I/O failures.
pub fn load_ivecs<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<VectorId>>> {
    let file = File::open(path.as_ref())?;
    let mut r = BufReader::new(file);

    let mut records = Vec::new();
    while let Some(k) = read_record_dim(&mut r)? {
        let mut ids = Vec::with_capacity(k);
        for _ in 0..k {
            let id = i32::from_le_bytes(read_array(&mut r)?);
            let id = u64::try_from(id)
                .map_err(|_| Error::MalformedDataset(format!("negative id {id} in ivecs")))?;
            ids.push(id);
        }
        records.push(ids);
    }
    Ok(records)
}

/// Reads a record's leading `i32` count; `None` at a clean EOF.
fn read_record_dim<R: Read>(r: &mut R) -> Result<Option<usize>> {
    let mut buf = [0u8; 4];
    match r.read_exact(&mut buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let dim = i32::from_le_bytes(buf);
    if dim <= 0 {
        return Err(Error::MalformedDataset(format!(
            "non-positive record dimension {dim}"
        )));
    }
    #[allow(clippy::cast_sign_loss)]
    Ok(Some(dim as usize))
}

/// Reads a fixed-width field; truncation inside a record is malformed,
/// not EOF.
fn read_array<R: Read, const N: usize>(r: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf).map_err(truncated)?;
    Ok(buf)
}

fn truncated(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::MalformedDataset("truncated record".to_string())
    } else {
        Error::Io(e)
    }
}

/// Standard normal sample via Box-Muller.
fn sample_standard_normal(rng: &mut StdRng) -> f32 {
    let u1: f32 = rng.random();
    let u2: f32 = rng.random();
    // Guard the log against u1 == 0.
    let u1 = u1.max(f32::MIN_POSITIVE);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}
