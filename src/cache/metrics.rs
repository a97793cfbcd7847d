//! Engine Metrics Module
//!
//! Process-lifetime performance counters owned exclusively by the cache
//! engine. Tiers report raw sizes; hit/miss semantics live here.

use serde::Serialize;

// == Hit Tier ==
/// Which tier satisfied a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTier {
    Memory,
    Disk,
}

// == Engine Metrics ==
/// Tracks cache performance counters. Reset only when the engine restarts.
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    /// Number of get operations issued
    pub total_requests: u64,
    /// Lookups satisfied by the memory tier
    pub memory_hits: u64,
    /// Lookups satisfied by the disk tier
    pub disk_hits: u64,
    /// Lookups satisfied by no tier
    pub misses: u64,
    /// Number of set operations
    pub writes: u64,
    /// Number of delete operations
    pub deletes: u64,
    /// Entries removed by capacity eviction
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Number of clear-all operations
    pub clear_operations: u64,
    /// Rolling average get latency in milliseconds
    pub avg_response_time_ms: f64,
}

impl EngineMetrics {
    /// Creates a new EngineMetrics with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / total requests, or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.memory_hits + self.disk_hits) as f64 / self.total_requests as f64
        }
    }

    // == Record Hit ==
    /// Records a successful lookup in the given tier with its latency.
    pub fn record_hit(&mut self, tier: HitTier, elapsed_ms: f64) {
        self.total_requests += 1;
        match tier {
            HitTier::Memory => self.memory_hits += 1,
            HitTier::Disk => self.disk_hits += 1,
        }
        self.update_response_time(elapsed_ms);
    }

    // == Record Miss ==
    /// Records a failed lookup with its latency.
    pub fn record_miss(&mut self, elapsed_ms: f64) {
        self.total_requests += 1;
        self.misses += 1;
        self.update_response_time(elapsed_ms);
    }

    /// Increments the write counter.
    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    /// Increments the delete counter.
    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    /// Adds `count` capacity evictions.
    pub fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }

    /// Adds `count` TTL expirations.
    pub fn record_expirations(&mut self, count: u64) {
        self.expirations += count;
    }

    /// Increments the clear-operations counter.
    pub fn record_clear(&mut self) {
        self.clear_operations += 1;
    }

    /// Folds one observation into the rolling average latency.
    fn update_response_time(&mut self, elapsed_ms: f64) {
        let n = self.total_requests as f64;
        self.avg_response_time_ms += (elapsed_ms - self.avg_response_time_ms) / n;
    }
}

// == Statistics Snapshot ==
/// Point-in-time view of the engine's counters plus per-tier occupancy,
/// serialized on the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatistics {
    pub total_requests: u64,
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub writes: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub clear_operations: u64,
    pub avg_response_time_ms: f64,
    pub memory_entries: usize,
    pub memory_size_bytes: u64,
    pub memory_max_bytes: u64,
    pub disk_entries: usize,
    pub disk_size_bytes: u64,
    pub disk_max_bytes: u64,
}
