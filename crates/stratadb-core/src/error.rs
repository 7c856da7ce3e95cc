//! Error types for `StrataDB`.
//!
//! One unified error type covers all core operations. Storage lookups for
//! absent ids are not errors; they surface as `Ok(None)` from the backend.

use thiserror::Error;

/// Result type alias for `StrataDB` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `StrataDB` operations.
///
/// Error codes follow the pattern `STRATA-XXX` for easy debugging.
#[derive(Error, Debug)]
pub enum Error {
    /// Dimension mismatch (STRATA-001).
    #[error("[STRATA-001] Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Invalid configuration (STRATA-002).
    #[error("[STRATA-002] Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed dataset file (STRATA-003).
    #[error("[STRATA-003] Malformed dataset: {0}")]
    MalformedDataset(String),

    /// IO error (STRATA-004).
    #[error("[STRATA-004] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Index stream corrupted (STRATA-005).
    ///
    /// Indicates that a saved index is truncated or inconsistent and must be
    /// rebuilt from the source vectors.
    #[error("[STRATA-005] Index corrupted: {0}")]
    IndexCorrupted(String),

    /// Storage error (STRATA-006).
    #[error("[STRATA-006] Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Returns the error code (e.g., "STRATA-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DimensionMismatch { .. } => "STRATA-001",
            Self::InvalidConfig(_) => "STRATA-002",
            Self::MalformedDataset(_) => "STRATA-003",
            Self::Io(_) => "STRATA-004",
            Self::IndexCorrupted(_) => "STRATA-005",
            Self::Storage(_) => "STRATA-006",
        }
    }

    /// Returns true if this error is recoverable.
    ///
    /// A corrupted index stream is not; everything else can be retried with
    /// corrected inputs.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::IndexCorrupted(_))
    }
}
