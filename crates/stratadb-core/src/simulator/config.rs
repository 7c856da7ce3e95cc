//! Configuration for ANN-in-SSD simulations.

use serde::{Deserialize, Serialize};

use super::ssd::SsdDeviceConfig;

/// How vectors are placed into fixed-size blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    /// Block `b` owns the contiguous id range `[b*K, (b+1)*K)`.
    #[default]
    HashHome,
    /// One-pass nearest-centroid assignment from strided seed centroids.
    /// Block sizes come out imbalanced; that is accepted.
    LocalityAware,
}

/// In-block representation, as far as the accounting model cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    /// Full-precision vectors; every distance in a visited block is
    /// charged.
    #[default]
    Raw,
    /// Models a perfect in-block filter: distances are still computed for
    /// every vector (recall is unaffected) but `distances_computed`
    /// charges only `min(16, block_len)` per block. Deliberately a cheated
    /// accounting mode; downstream studies rely on it staying this way.
    MicroIndex,
}

/// How device time is charged for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    /// One simulator read per visited block, per query.
    #[default]
    Faithful,
    /// Analytic bulk estimate from total visited blocks and the hardware
    /// envelope; upper-bounds achievable throughput.
    Cheated,
}

/// How the entry blocks of a query are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryBlockStrategy {
    /// Nearest blocks by query-to-centroid distance.
    #[default]
    CentroidKnn,
}

/// Hardware capability level. Sets device defaults, entry fan-out, and the
/// compute envelope for cheated-mode estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HardwareLevel {
    /// Baseline SATA-class device, controller-only compute.
    #[default]
    L0,
    /// NVMe-class device, controller-only compute.
    L1,
    /// NVMe with 4 near-data compute units.
    L2,
    /// High-end device with 8 near-data compute units.
    L3,
}

impl HardwareLevel {
    /// Device timing defaults for this level.
    #[must_use]
    pub fn device_defaults(self) -> SsdDeviceConfig {
        match self {
            Self::L0 => SsdDeviceConfig {
                num_channels: 4,
                queue_depth_per_channel: 64,
                base_read_latency_us: 80.0,
                internal_read_bandwidth_gbps: 3.0,
            },
            Self::L1 => SsdDeviceConfig {
                num_channels: 4,
                queue_depth_per_channel: 64,
                base_read_latency_us: 60.0,
                internal_read_bandwidth_gbps: 6.0,
            },
            Self::L2 => SsdDeviceConfig {
                num_channels: 8,
                queue_depth_per_channel: 64,
                base_read_latency_us: 40.0,
                internal_read_bandwidth_gbps: 10.0,
            },
            Self::L3 => SsdDeviceConfig {
                num_channels: 16,
                queue_depth_per_channel: 128,
                base_read_latency_us: 20.0,
                internal_read_bandwidth_gbps: 20.0,
            },
        }
    }

    /// Number of entry blocks a query fans out to.
    #[must_use]
    pub fn entry_fanout(self) -> usize {
        match self {
            Self::L0 | Self::L1 => 1,
            Self::L2 => 4,
            Self::L3 => 8,
        }
    }

    /// Default `(controller, near_data)` GFLOP/s envelope.
    ///
    /// The near-data figures fold in the per-unit throughput times the
    /// unit count (4 units at L2, 8 at L3).
    #[must_use]
    pub fn gflops_defaults(self) -> (f64, f64) {
        match self {
            Self::L0 => (0.25, 0.0),
            Self::L1 => (1.0, 0.0),
            Self::L2 => (1.0, 14.0 * 4.0),
            Self::L3 => (1.0, 19.0 * 8.0),
        }
    }
}

/// Configuration for one ANN-in-SSD simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnInSsdConfig {
    /// Dataset label echoed into the JSON log.
    pub dataset_name: String,
    /// Restricts the dataset view; 0 = use the dataset's dimension.
    pub dimension: usize,
    /// Restricts the dataset view; 0 = all vectors.
    pub num_vectors: usize,

    /// Vector placement across blocks.
    pub placement_mode: PlacementMode,
    /// Block size K.
    pub vectors_per_block: usize,
    /// Centroid-KNN portal neighbors per block (ring backbone is always
    /// added on top).
    pub portal_degree: usize,
    /// Flash page size charged per visited block; 0 = `K * dim * 4`.
    pub page_size_bytes: usize,
    /// In-block representation for the accounting model.
    pub code_type: CodeType,

    /// Hardware capability level.
    pub hardware_level: HardwareLevel,
    /// Overrides the level's channel count when > 0.
    pub num_channels: usize,
    /// Overrides the level's queue depth when > 0.
    pub queue_depth_per_channel: usize,
    /// Overrides the level's base read latency when > 0.
    pub base_read_latency_us: f64,
    /// Overrides the level's internal bandwidth when > 0.
    pub internal_read_bandwidth_gbps: f64,
    /// Overrides the level's controller GFLOP/s when > 0.
    pub controller_flops_gf: f64,
    /// Overrides the level's near-data GFLOP/s when > 0.
    pub per_block_unit_flops_gf: f64,

    /// Neighbors returned per query.
    pub k: usize,
    /// Cap on blocks visited per query; 0 = unlimited.
    pub max_steps: usize,
    /// Entry block selection strategy.
    pub entry_block_strategy: EntryBlockStrategy,
    /// Number of queries the harness samples; echoed into the log.
    pub num_queries: usize,
    /// Query sampling seed; echoed into the log.
    pub seed: u64,
    /// Device-time accounting mode.
    pub simulation_mode: SimulationMode,

    /// Retain per-query results and emit them in the JSON log.
    pub record_per_query: bool,
    /// Accepted and echoed; per-block recording is not implemented.
    pub record_per_block: bool,
    /// JSON log destination used by the harness.
    pub output_path: String,
}

impl Default for AnnInSsdConfig {
    fn default() -> Self {
        Self {
            dataset_name: String::new(),
            dimension: 0,
            num_vectors: 0,
            placement_mode: PlacementMode::default(),
            vectors_per_block: 128,
            portal_degree: 1,
            page_size_bytes: 0,
            code_type: CodeType::default(),
            hardware_level: HardwareLevel::default(),
            num_channels: 0,
            queue_depth_per_channel: 0,
            base_read_latency_us: 0.0,
            internal_read_bandwidth_gbps: 0.0,
            controller_flops_gf: 0.0,
            per_block_unit_flops_gf: 0.0,
            k: 10,
            max_steps: 0,
            entry_block_strategy: EntryBlockStrategy::default(),
            num_queries: 0,
            seed: 0,
            simulation_mode: SimulationMode::default(),
            record_per_query: false,
            record_per_block: false,
            output_path: String::new(),
        }
    }
}

impl AnnInSsdConfig {
    /// Device configuration: level defaults with positive overrides
    /// applied field by field.
    #[must_use]
    pub fn device_config(&self) -> SsdDeviceConfig {
        let mut dev = self.hardware_level.device_defaults();
        if self.num_channels > 0 {
            dev.num_channels = self.num_channels;
        }
        if self.queue_depth_per_channel > 0 {
            dev.queue_depth_per_channel = self.queue_depth_per_channel;
        }
        if self.base_read_latency_us > 0.0 {
            dev.base_read_latency_us = self.base_read_latency_us;
        }
        if self.internal_read_bandwidth_gbps > 0.0 {
            dev.internal_read_bandwidth_gbps = self.internal_read_bandwidth_gbps;
        }
        dev
    }

    /// Compute envelope `(controller, near_data)` in GFLOP/s: level
    /// defaults unless either override is positive.
    #[must_use]
    pub fn gflops(&self) -> (f64, f64) {
        if self.controller_flops_gf > 0.0 || self.per_block_unit_flops_gf > 0.0 {
            (self.controller_flops_gf, self.per_block_unit_flops_gf)
        } else {
            self.hardware_level.gflops_defaults()
        }
    }

    /// Effective block size K; the 0 sentinel falls back to 128.
    #[must_use]
    pub fn effective_vectors_per_block(&self) -> usize {
        if self.vectors_per_block == 0 {
            128
        } else {
            self.vectors_per_block
        }
    }

    /// Effective portal degree; the 0 sentinel falls back to 1.
    #[must_use]
    pub fn effective_portal_degree(&self) -> usize {
        if self.portal_degree == 0 {
            1
        } else {
            self.portal_degree
        }
    }
}
