//! Tiered storage: a bounded DRAM cache in front of a backing backend.
//!
//! Every read consults the cache first; misses go to the backing store and
//! install the payload on the way back. Writes go through to backing before
//! the cache is updated, so a cache hit can never observe data that is not
//! yet durable in backing. An optional SSD device model charges modeled
//! service time for every backing read.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{IoStats, StorageBackend};
use crate::cache::{CachePolicy, CachePolicyKind};
use crate::simulator::{SsdDeviceConfig, SsdSimulator};
use crate::{Result, VectorData, VectorId};

struct TieredState {
    cache: FxHashMap<VectorId, VectorData>,
    policy: Box<dyn CachePolicy>,
    stats: IoStats,
    cache_hits: u64,
    cache_misses: u64,
    /// Optional SSD timing model; every backing read is also charged here.
    ssd_sim: Option<SsdSimulator>,
}

impl TieredState {
    /// Installs or refreshes a cache entry, evicting per policy first.
    /// Caller holds the tiered mutex. A zero-capacity cache makes this a
    /// no-op.
    fn install(&mut self, id: VectorId, data: &[f32]) {
        if self.policy.capacity() == 0 {
            return;
        }

        if let Some(existing) = self.cache.get_mut(&id) {
            existing.clear();
            existing.extend_from_slice(data);
            self.policy.record_access(id);
            return;
        }

        if let Some(victim) = self.policy.on_insert(id) {
            self.cache.remove(&victim);
        }
        self.cache.insert(id, data.to_vec());
    }
}

/// Cache-fronted storage backend with I/O and hit/miss accounting.
pub struct TieredBackend {
    backing: Arc<dyn StorageBackend>,
    cache_capacity: usize,
    state: Mutex<TieredState>,
}

impl TieredBackend {
    /// Creates a tiered backend over `backing` with a cache of
    /// `cache_capacity` vectors evicted by `policy`.
    #[must_use]
    pub fn new(
        backing: Arc<dyn StorageBackend>,
        cache_capacity: usize,
        policy: CachePolicyKind,
    ) -> Self {
        Self {
            backing,
            cache_capacity,
            state: Mutex::new(TieredState {
                cache: FxHashMap::default(),
                policy: policy.build(cache_capacity),
                stats: IoStats::default(),
                cache_hits: 0,
                cache_misses: 0,
                ssd_sim: None,
            }),
        }
    }

    /// Attaches an SSD device timing model. Backing reads from now on are
    /// also recorded into the model; query the accumulated service time
    /// via [`TieredBackend::device_time_us`].
    pub fn enable_device_model(&self, config: SsdDeviceConfig) {
        self.state.lock().ssd_sim = Some(SsdSimulator::new(config));
    }

    /// Accumulated modeled SSD service time in microseconds since the last
    /// [`StorageBackend::reset_stats`]. Zero when no model is attached.
    #[must_use]
    pub fn device_time_us(&self) -> f64 {
        self.state
            .lock()
            .ssd_sim
            .as_ref()
            .map_or(0.0, SsdSimulator::total_time_us)
    }

    /// Records a logical read of `bytes` without touching the backing
    /// store or the cache. Intended for analytic modes where the index
    /// operates out of DRAM but I/O statistics and device time should
    /// still approximate a storage-resident run.
    pub fn record_logical_read_bytes(&self, bytes: u64) {
        let mut state = self.state.lock();
        state.stats.num_reads += 1;
        state.stats.bytes_read += bytes;
        if let Some(sim) = state.ssd_sim.as_mut() {
            sim.record_read(bytes);
        }
    }

    /// Records a logical write of `bytes` without touching the backing
    /// store or the cache.
    pub fn record_logical_write_bytes(&self, bytes: u64) {
        let mut state = self.state.lock();
        state.stats.num_writes += 1;
        state.stats.bytes_written += bytes;
    }

    /// Number of vectors currently resident in the cache.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Maximum number of vectors the cache will hold.
    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// Number of reads served from the cache.
    #[must_use]
    pub fn cache_hits(&self) -> u64 {
        self.state.lock().cache_hits
    }

    /// Number of reads that went to the backing store.
    #[must_use]
    pub fn cache_misses(&self) -> u64 {
        self.state.lock().cache_misses
    }

    /// True when `id` is currently resident in the cache.
    #[must_use]
    pub fn cache_contains(&self, id: VectorId) -> bool {
        self.state.lock().cache.contains_key(&id)
    }

    /// The backing store this tier fronts.
    #[must_use]
    pub fn backing(&self) -> &Arc<dyn StorageBackend> {
        &self.backing
    }
}

impl StorageBackend for TieredBackend {
    fn read(&self, id: VectorId) -> Result<Option<VectorData>> {
        {
            let mut state = self.state.lock();
            let cached = state.cache.get(&id).cloned();
            if let Some(out) = cached {
                state.policy.record_access(id);
                state.cache_hits += 1;
                return Ok(Some(out));
            }
        }

        // Miss: go to backing without holding the tier lock. The backing
        // backend's own concurrency contract applies here.
        let start = Instant::now();
        let Some(data) = self.backing.read(id)? else {
            return Ok(None);
        };
        let elapsed_us = start.elapsed().as_secs_f64() * 1e6;
        let bytes = (data.len() * std::mem::size_of::<f32>()) as u64;

        let mut state = self.state.lock();
        state.stats.num_reads += 1;
        state.stats.bytes_read += bytes;
        state.stats.total_read_latency_us += elapsed_us;
        state.cache_misses += 1;
        if let Some(sim) = state.ssd_sim.as_mut() {
            sim.record_read(bytes);
        }
        state.install(id, &data);

        Ok(Some(data))
    }

    fn write(&self, id: VectorId, data: &[f32]) -> Result<()> {
        // Write-through: backing first, then the cache, so a later hit can
        // only observe durable data.
        let start = Instant::now();
        self.backing.write(id, data)?;
        let elapsed_us = start.elapsed().as_secs_f64() * 1e6;
        let bytes = (data.len() * std::mem::size_of::<f32>()) as u64;

        let mut state = self.state.lock();
        state.stats.num_writes += 1;
        state.stats.bytes_written += bytes;
        state.stats.total_write_latency_us += elapsed_us;
        state.install(id, data);

        Ok(())
    }

    fn stats(&self) -> IoStats {
        self.state.lock().stats
    }

    fn reset_stats(&self) {
        let mut state = self.state.lock();
        state.stats = IoStats::default();
        state.cache_hits = 0;
        state.cache_misses = 0;
        if let Some(sim) = state.ssd_sim.as_mut() {
            sim.reset_stats();
        }
        self.backing.reset_stats();
    }
}
