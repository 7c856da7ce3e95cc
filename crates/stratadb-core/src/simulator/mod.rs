//! ANN-in-SSD simulation.
//!
//! Two layers: [`SsdSimulator`] is a per-read analytic device-time
//! accumulator (also embedded in [`crate::TieredBackend`]);
//! [`AnnInSsdModel`] navigates a cluster-and-portal block graph over a
//! dataset and estimates recall, latency, and device service time for
//! in-storage ANN designs.

mod block_graph;
mod config;
mod model;
mod ssd;

#[cfg(test)]
mod tests;

pub use block_graph::BlockId;
pub use config::{
    AnnInSsdConfig, CodeType, EntryBlockStrategy, HardwareLevel, PlacementMode, SimulationMode,
};
pub use model::{AnnInSsdModel, Query, QueryResult, SimulationSummary};
pub use ssd::{SsdDeviceConfig, SsdSimulator};
