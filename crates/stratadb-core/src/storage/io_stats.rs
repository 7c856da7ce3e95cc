//! I/O statistics tracking.

use serde::{Deserialize, Serialize};

/// Accumulated I/O counters for a storage backend.
///
/// All counters are monotone non-decreasing within a stats epoch (between
/// calls to `reset_stats`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IoStats {
    /// Number of completed reads.
    pub num_reads: u64,
    /// Number of completed writes.
    pub num_writes: u64,
    /// Total bytes read.
    pub bytes_read: u64,
    /// Total bytes written.
    pub bytes_written: u64,
    /// Total wall-clock read latency in microseconds.
    pub total_read_latency_us: f64,
    /// Total wall-clock write latency in microseconds.
    pub total_write_latency_us: f64,
}

impl IoStats {
    /// Average read latency in microseconds; 0 when no reads completed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_read_latency_us(&self) -> f64 {
        if self.num_reads > 0 {
            self.total_read_latency_us / self.num_reads as f64
        } else {
            0.0
        }
    }

    /// Average write latency in microseconds; 0 when no writes completed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_write_latency_us(&self) -> f64 {
        if self.num_writes > 0 {
            self.total_write_latency_us / self.num_writes as f64
        } else {
            0.0
        }
    }
}
