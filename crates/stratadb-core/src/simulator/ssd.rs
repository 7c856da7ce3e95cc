//! Analytic SSD device-time model.

use serde::{Deserialize, Serialize};

use crate::storage::IoStats;

/// SSD device configuration used by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SsdDeviceConfig {
    /// Number of independent flash channels.
    pub num_channels: usize,
    /// Command queue depth per channel.
    pub queue_depth_per_channel: usize,
    /// Fixed per-read latency in microseconds.
    pub base_read_latency_us: f64,
    /// Internal read bandwidth in GB/s.
    pub internal_read_bandwidth_gbps: f64,
}

impl SsdDeviceConfig {
    /// Effective parallelism factor; never below 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn parallelism(&self) -> f64 {
        let parallel = self.num_channels * self.queue_depth_per_channel;
        if parallel == 0 {
            1.0
        } else {
            parallel as f64
        }
    }

    /// Modeled service time in microseconds for one read of `bytes`.
    ///
    /// `base + bytes/bandwidth`, divided by the channel/queue parallelism.
    /// This is an analytic approximation, not a queue simulation.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn read_time_us(&self, bytes: u64) -> f64 {
        let mut t_us = self.base_read_latency_us;
        if self.internal_read_bandwidth_gbps > 0.0 {
            let bw_bytes_per_us = self.internal_read_bandwidth_gbps * 1e9 / 1e6;
            t_us += bytes as f64 / bw_bytes_per_us;
        }
        t_us / self.parallelism()
    }
}

/// Accumulates modeled SSD service time over a sequence of logical reads.
#[derive(Debug, Clone, Default)]
pub struct SsdSimulator {
    config: SsdDeviceConfig,
    io_stats: IoStats,
    total_time_us: f64,
}

impl SsdSimulator {
    /// Creates a simulator with the given device configuration.
    #[must_use]
    pub fn new(config: SsdDeviceConfig) -> Self {
        Self {
            config,
            io_stats: IoStats::default(),
            total_time_us: 0.0,
        }
    }

    /// The device configuration this simulator models.
    #[must_use]
    pub fn config(&self) -> &SsdDeviceConfig {
        &self.config
    }

    /// Records a logical read of `bytes`, updating stats and the modeled
    /// service-time accumulator.
    pub fn record_read(&mut self, bytes: u64) {
        self.io_stats.num_reads += 1;
        self.io_stats.bytes_read += bytes;
        self.total_time_us += self.config.read_time_us(bytes);
    }

    /// Snapshot of the simulated I/O statistics.
    #[must_use]
    pub fn stats(&self) -> IoStats {
        self.io_stats
    }

    /// Total modeled service time in microseconds.
    #[must_use]
    pub fn total_time_us(&self) -> f64 {
        self.total_time_us
    }

    /// Clears stats and the service-time accumulator.
    pub fn reset_stats(&mut self) {
        self.io_stats = IoStats::default();
        self.total_time_us = 0.0;
    }
}
