//! ANN-in-SSD block model: per-query navigation, batch orchestration, and
//! the JSON run log.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::dataset::Dataset;
use crate::simd;
use crate::storage::IoStats;
use crate::{Error, Result, VectorData, VectorId};

use super::block_graph::{BlockGraph, BlockId};
use super::config::{AnnInSsdConfig, CodeType, SimulationMode};
use super::ssd::SsdSimulator;

/// Distances charged per block under the `micro_index` perfect-filter
/// accounting.
const MICRO_INDEX_CHARGE: usize = 16;

/// One query to the simulator.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Caller-chosen query identifier, echoed into the result.
    pub id: VectorId,
    /// Query vector.
    pub values: VectorData,
    /// Optional ground-truth neighbor ids for recall scoring.
    pub true_neighbors: Vec<VectorId>,
}

/// Result and counters for a single query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    /// Echo of [`Query::id`].
    pub query_id: VectorId,
    /// Returned neighbor ids, ascending by distance.
    pub found_neighbors: Vec<VectorId>,
    /// Distances matching `found_neighbors`.
    pub found_scores: Vec<f32>,

    /// Blocks popped from the navigation frontier.
    pub blocks_visited: usize,
    /// First-time pushes of a portal neighbor onto the frontier.
    pub portal_steps: usize,
    /// One per visited block.
    pub internal_reads: usize,
    /// Distance charges; see [`CodeType`] for the `micro_index` rule.
    pub distances_computed: usize,

    /// Host wall-clock time for this query in microseconds.
    pub estimated_latency_us: f64,
}

/// Aggregate statistics across a batch of queries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationSummary {
    /// Copy of the config used for this run.
    pub config: AnnInSsdConfig,

    /// Neighbors requested per query.
    pub k: usize,
    /// Queries in the batch.
    pub num_queries: usize,

    /// Mean recall@k over queries with ground truth.
    pub recall_at_k: f64,
    /// Host wall-clock queries per second.
    pub qps: f64,

    /// Median host latency in microseconds.
    pub latency_us_p50: f64,
    /// 95th-percentile host latency in microseconds.
    pub latency_us_p95: f64,
    /// 99th-percentile host latency in microseconds.
    pub latency_us_p99: f64,

    /// Mean blocks visited per query.
    pub avg_blocks_visited: f64,
    /// Mean portal steps per query.
    pub avg_portal_steps: f64,
    /// Mean internal reads per query.
    pub avg_internal_reads: f64,
    /// Mean distance charges per query.
    pub avg_distances_computed: f64,

    /// Simulated device I/O for the batch.
    pub io_stats: IoStats,
    /// Modeled SSD service time for the batch in microseconds.
    pub device_time_us: f64,
}

/// Analytic ANN-in-SSD search model over a read-only dataset view.
pub struct AnnInSsdModel {
    config: AnnInSsdConfig,
    dataset: Arc<Dataset>,
    graph: Option<BlockGraph>,
    summary: SimulationSummary,
    /// Per-query results retained when `record_per_query` is set.
    recorded: Vec<QueryResult>,
    /// Dimension resolved by the last batch; covers configs that leave
    /// `dimension` at 0 and inherit it from the dataset.
    effective_dim: usize,
}

impl AnnInSsdModel {
    /// Creates a model over `dataset` with the given configuration.
    #[must_use]
    pub fn new(config: AnnInSsdConfig, dataset: Arc<Dataset>) -> Self {
        let summary = SimulationSummary {
            config: config.clone(),
            k: config.k,
            ..SimulationSummary::default()
        };
        Self {
            config,
            dataset,
            graph: None,
            summary,
            recorded: Vec::new(),
            effective_dim: 0,
        }
    }

    /// The configuration this model runs with.
    #[must_use]
    pub fn config(&self) -> &AnnInSsdConfig {
        &self.config
    }

    /// Aggregate statistics after one or more batches.
    #[must_use]
    pub fn summary(&self) -> &SimulationSummary {
        &self.summary
    }

    /// Dataset view size and dimension after applying the config's
    /// restrictions.
    fn view(&self) -> (usize, usize) {
        let mut n = self.dataset.len();
        if self.config.num_vectors > 0 && self.config.num_vectors < n {
            n = self.config.num_vectors;
        }
        let dim = if self.config.dimension > 0 {
            self.config.dimension
        } else {
            self.dataset.dimension()
        };
        (n, dim)
    }

    /// Block-to-vector assignment, building the block graph lazily.
    /// Introspection surface for analysis tooling and tests.
    #[must_use]
    pub fn block_assignments(&mut self) -> Vec<Vec<VectorId>> {
        let (n, dim) = self.view();
        if n == 0 || dim == 0 {
            return Vec::new();
        }
        self.ensure_graph(n, dim);
        self.graph
            .as_ref()
            .map_or_else(Vec::new, |g| g.assignment.clone())
    }

    /// Portal adjacency per block, building the block graph lazily.
    /// Introspection surface for analysis tooling and tests.
    #[must_use]
    pub fn portal_neighbors(&mut self) -> Vec<Vec<BlockId>> {
        let (n, dim) = self.view();
        if n == 0 || dim == 0 {
            return Vec::new();
        }
        self.ensure_graph(n, dim);
        self.graph
            .as_ref()
            .map_or_else(Vec::new, |g| g.neighbors.clone())
    }

    /// Builds the block graph when absent or shape-stale.
    fn ensure_graph(&mut self, n: usize, dim: usize) {
        let vectors_per_block = self.config.effective_vectors_per_block();
        let num_blocks = n.div_ceil(vectors_per_block);
        let stale = self
            .graph
            .as_ref()
            .is_none_or(|g| !g.matches(dim, vectors_per_block, num_blocks));
        if stale {
            let start = Instant::now();
            self.graph = Some(BlockGraph::build(&self.config, &self.dataset, n, dim));
            info!(
                num_blocks,
                vectors_per_block,
                placement = ?self.config.placement_mode,
                elapsed_s = start.elapsed().as_secs_f64(),
                "block graph built"
            );
        }
    }

    /// Runs one query through the block graph. Primarily for debugging
    /// and tests; batches should go through
    /// [`AnnInSsdModel::search_batch`].
    pub fn search_one(&mut self, query: &Query) -> QueryResult {
        let mut result = QueryResult {
            query_id: query.id,
            ..QueryResult::default()
        };

        let (n, dim) = self.view();
        if n == 0 || dim == 0 || query.values.len() != dim {
            return result;
        }

        let mut k = self.config.k;
        if k == 0 {
            return result;
        }
        k = k.min(n);

        self.ensure_graph(n, dim);
        let graph = self.graph.as_ref().expect("graph built above");
        let num_blocks = graph.assignment.len();

        let max_blocks_to_visit = if self.config.max_steps > 0 {
            self.config.max_steps.min(num_blocks)
        } else {
            num_blocks
        };

        // Seed the frontier with the entry blocks; fan-out widens with the
        // hardware level.
        let mut visited = vec![false; num_blocks];
        let mut queue: Vec<BlockId> = Vec::with_capacity(num_blocks);
        let fanout = self.config.hardware_level.entry_fanout();

        let mut entry_candidates: Vec<(f32, BlockId)> = graph
            .centroids
            .iter()
            .enumerate()
            .filter(|(_, c)| c.len() == dim)
            .map(|(b, c)| (simd::l2_squared(&query.values, c), b))
            .collect();
        let keep = fanout.min(entry_candidates.len());
        if keep > 0 {
            entry_candidates.select_nth_unstable_by(keep - 1, |a, b| a.0.total_cmp(&b.0));
            for &(_, b) in &entry_candidates[..keep] {
                if !visited[b] {
                    visited[b] = true;
                    queue.push(b);
                }
            }
        } else {
            visited[0] = true;
            queue.push(0);
        }

        // FIFO frontier expansion over portal edges, capped at
        // `max_steps` visited blocks.
        let mut block_order: Vec<BlockId> = Vec::with_capacity(max_blocks_to_visit);
        let mut head = 0usize;
        while head < queue.len() && block_order.len() < max_blocks_to_visit {
            let b = queue[head];
            head += 1;
            block_order.push(b);

            for &nb in &graph.neighbors[b] {
                if nb < num_blocks && !visited[nb] {
                    visited[nb] = true;
                    queue.push(nb);
                    result.portal_steps += 1;
                }
            }
        }

        result.blocks_visited = block_order.len();

        // Scan every vector of every visited block. Under `micro_index`
        // all distances are still computed (recall is exact for the
        // visited set) but the charge models a perfect in-block filter.
        let mut dist_id: Vec<(f32, VectorId)> = Vec::new();
        for &b in &block_order {
            let ids = &graph.assignment[b];
            for &vid in ids {
                let vec = self.dataset.vector(vid as usize);
                if vec.len() < dim {
                    continue;
                }
                let d = simd::l2_squared(&query.values, &vec[..dim]);
                dist_id.push((d, vid));
            }
            result.distances_computed += match self.config.code_type {
                CodeType::MicroIndex => ids.len().min(MICRO_INDEX_CHARGE),
                CodeType::Raw => ids.len(),
            };
            result.internal_reads += 1;
        }

        let kk = k.min(dist_id.len());
        if kk == 0 {
            return result;
        }

        dist_id.select_nth_unstable_by(kk - 1, |a, b| a.0.total_cmp(&b.0));
        dist_id.truncate(kk);
        dist_id.sort_by(|a, b| a.0.total_cmp(&b.0));

        result.found_neighbors = dist_id.iter().map(|&(_, id)| id).collect();
        result.found_scores = dist_id.iter().map(|&(d, _)| d).collect();
        result
    }

    /// Runs a batch of queries serially, producing per-query results and
    /// refreshing the [`SimulationSummary`].
    #[allow(clippy::cast_precision_loss)]
    pub fn search_batch(&mut self, queries: &[Query]) -> Vec<QueryResult> {
        let (_, dim) = self.view();
        self.effective_dim = dim;

        let vectors_per_block = self.config.effective_vectors_per_block();
        let bytes_per_block = if self.config.page_size_bytes > 0 {
            self.config.page_size_bytes as u64
        } else {
            (vectors_per_block * dim * std::mem::size_of::<f32>()) as u64
        };

        let device = self.config.device_config();
        let faithful = self.config.simulation_mode == SimulationMode::Faithful;
        let mut sim = SsdSimulator::new(device);

        let mut results = Vec::with_capacity(queries.len());
        let mut latencies_us = Vec::with_capacity(queries.len());

        let batch_start = Instant::now();
        for query in queries {
            let query_start = Instant::now();
            let mut result = self.search_one(query);
            let elapsed_us = query_start.elapsed().as_secs_f64() * 1e6;
            result.estimated_latency_us = elapsed_us;
            latencies_us.push(elapsed_us);

            if faithful && bytes_per_block > 0 {
                for _ in 0..result.blocks_visited {
                    sim.record_read(bytes_per_block);
                }
            }

            results.push(result);
        }
        let total_s = batch_start.elapsed().as_secs_f64();

        self.summary.num_queries = queries.len();
        self.summary.qps = if total_s > 0.0 && !queries.is_empty() {
            queries.len() as f64 / total_s
        } else {
            0.0
        };

        latencies_us.sort_by(f64::total_cmp);
        let percentile = |p: f64| -> f64 {
            if latencies_us.is_empty() {
                return 0.0;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = (p * (latencies_us.len() - 1) as f64) as usize;
            latencies_us[idx]
        };
        self.summary.latency_us_p50 = percentile(0.50);
        self.summary.latency_us_p95 = percentile(0.95);
        self.summary.latency_us_p99 = percentile(0.99);

        let total_blocks: f64 = results.iter().map(|r| r.blocks_visited as f64).sum();
        if results.is_empty() {
            self.summary.avg_blocks_visited = 0.0;
            self.summary.avg_portal_steps = 0.0;
            self.summary.avg_internal_reads = 0.0;
            self.summary.avg_distances_computed = 0.0;
        } else {
            let denom = results.len() as f64;
            self.summary.avg_blocks_visited = total_blocks / denom;
            self.summary.avg_portal_steps =
                results.iter().map(|r| r.portal_steps as f64).sum::<f64>() / denom;
            self.summary.avg_internal_reads =
                results.iter().map(|r| r.internal_reads as f64).sum::<f64>() / denom;
            self.summary.avg_distances_computed = results
                .iter()
                .map(|r| r.distances_computed as f64)
                .sum::<f64>()
                / denom;
        }

        self.summary.recall_at_k = recall_at_k(self.config.k, queries, &results);

        if faithful {
            self.summary.io_stats = sim.stats();
            self.summary.device_time_us = sim.total_time_us();
        } else {
            // Analytic bulk estimate: same per-read formula applied to the
            // total block count.
            let mut io = IoStats::default();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                io.num_reads = total_blocks as u64;
                io.bytes_read = io.num_reads * bytes_per_block;
            }
            self.summary.io_stats = io;
            self.summary.device_time_us = total_blocks * device.read_time_us(bytes_per_block);
        }

        if self.config.record_per_query {
            self.recorded = results.clone();
        }

        results
    }

    /// Host + device + compute timing roll-up used by the JSON log.
    fn effective_times(&self) -> EffectiveTimes {
        let s = &self.summary;
        let host_search_time_s = if s.qps > 0.0 && s.num_queries > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                s.num_queries as f64 / s.qps
            }
        } else {
            0.0
        };
        let device_time_s = s.device_time_us * 1e-6;
        let compute_time_s = self.estimate_compute_time_s();
        let analytic_search_time_s = if compute_time_s > 0.0 {
            compute_time_s + device_time_s
        } else {
            0.0
        };

        let cheated = self.config.simulation_mode != SimulationMode::Faithful;
        let effective_search_time_s = if cheated && analytic_search_time_s > 0.0 {
            analytic_search_time_s
        } else {
            host_search_time_s + device_time_s
        };
        let effective_qps = if effective_search_time_s > 0.0 && s.num_queries > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                s.num_queries as f64 / effective_search_time_s
            }
        } else {
            0.0
        };

        EffectiveTimes {
            host_search_time_s,
            compute_time_s,
            analytic_search_time_s,
            effective_search_time_s,
            effective_qps,
        }
    }

    /// Estimates batch compute time from the distance-charge averages and
    /// the hardware level's GFLOP/s envelope.
    #[allow(clippy::cast_precision_loss)]
    fn estimate_compute_time_s(&self) -> f64 {
        let s = &self.summary;
        if s.num_queries == 0 || s.avg_distances_computed <= 0.0 {
            return 0.0;
        }

        let dim = if self.config.dimension > 0 {
            self.config.dimension
        } else {
            self.effective_dim
        };
        if dim == 0 {
            return 0.0;
        }

        let flops_per_distance = 2.0 * dim as f64;
        let total_flops = s.avg_distances_computed * s.num_queries as f64 * flops_per_distance;

        let (controller, near_data) = self.config.gflops();
        let total_gflops = controller + near_data;
        if total_gflops <= 0.0 {
            return 0.0;
        }

        (total_flops * 1e-9) / total_gflops
    }

    /// Writes the JSON run log (`config` + `aggregate`, plus `per_query`
    /// when recording is on) to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an empty path and I/O or
    /// serialization failures otherwise.
    pub fn write_json_log(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "json log path must not be empty".to_string(),
            ));
        }

        let s = &self.summary;
        let t = self.effective_times();

        let mut aggregate = json!({
            "k": s.k,
            "num_queries": s.num_queries,
            "recall_at_k": s.recall_at_k,
            "qps": s.qps,
            "qps_search": s.qps,
            "qps_total": s.qps,
            "latency_us_p50": s.latency_us_p50,
            "latency_us_p95": s.latency_us_p95,
            "latency_us_p99": s.latency_us_p99,
            "effective_search_time_s": t.effective_search_time_s,
            "effective_qps": t.effective_qps,
            "host_search_time_s": t.host_search_time_s,
            "compute_time_s": t.compute_time_s,
            "analytic_search_time_s": t.analytic_search_time_s,
            "avg_blocks_visited": s.avg_blocks_visited,
            "avg_portal_steps": s.avg_portal_steps,
            "avg_internal_reads": s.avg_internal_reads,
            "avg_distances_computed": s.avg_distances_computed,
            "io": {
                "num_reads": s.io_stats.num_reads,
                "bytes_read": s.io_stats.bytes_read,
            },
            "device_time_us": s.device_time_us,
        });

        let mut log = json!({
            "config": s.config,
            "aggregate": aggregate.take(),
        });
        if self.config.record_per_query {
            log["per_query"] = serde_json::to_value(&self.recorded)
                .map_err(|e| Error::Storage(format!("per-query serialization: {e}")))?;
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &log)
            .map_err(|e| Error::Storage(format!("json log serialization: {e}")))?;
        Ok(())
    }
}

struct EffectiveTimes {
    host_search_time_s: f64,
    compute_time_s: f64,
    analytic_search_time_s: f64,
    effective_search_time_s: f64,
    effective_qps: f64,
}

/// Mean recall@k over queries that carry ground truth and produced
/// results. Each query scores `|found ∩ truth[..k']| / k'` with
/// `k' = min(k, |truth|)`.
#[allow(clippy::cast_precision_loss)]
fn recall_at_k(k: usize, queries: &[Query], results: &[QueryResult]) -> f64 {
    if k == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut with_truth = 0usize;

    for (query, result) in queries.iter().zip(results) {
        if query.true_neighbors.is_empty() || result.found_neighbors.is_empty() {
            continue;
        }
        let kk = k.min(query.true_neighbors.len());
        let truth = &query.true_neighbors[..kk];
        let hits = result
            .found_neighbors
            .iter()
            .take(kk)
            .filter(|id| truth.contains(id))
            .count();
        total += hits as f64 / kk as f64;
        with_truth += 1;
    }

    if with_truth > 0 {
        total / with_truth as f64
    } else {
        0.0
    }
}
