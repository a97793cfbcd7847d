//! Cache Engine Module
//!
//! Orchestrates the memory and disk tiers: lifecycle state machine, strategy
//! routing, hybrid promotion, batch operations, cache warming, statistics and
//! health reporting. Each tier sits behind its own lock (its isolation
//! domain); the engine owns the metrics and mutates them through a single
//! serialized path of its own.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::cache::disk::DiskTier;
use crate::cache::entry::CacheEntry;
use crate::cache::memory::MemoryTier;
use crate::cache::metrics::{CacheStatistics, EngineMetrics, HitTier};
use crate::cache::MAX_KEY_LENGTH;
use crate::config::{CacheConfig, CacheStrategy};
use crate::error::{CacheError, Result};

// == Engine State ==
/// Lifecycle state of the engine. `Shutdown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Error,
    Shutdown,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initializing => "initializing",
            EngineState::Ready => "ready",
            EngineState::Error => "error",
            EngineState::Shutdown => "shutdown",
        };
        write!(f, "{}", name)
    }
}

// == Cache Health ==
/// Weighted health assessment: 60% hit rate, 40% inverse of the worse tier
/// utilization. Scores below 0.7 are flagged unhealthy.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheHealth {
    pub score: f64,
    pub healthy: bool,
    pub hit_rate: f64,
    pub memory_utilization: f64,
    pub disk_utilization: f64,
    pub recommendations: Vec<String>,
}

/// Utilization above this fraction draws a capacity recommendation.
const HIGH_UTILIZATION: f64 = 0.85;

/// Hit rate below this fraction draws a hit-rate recommendation.
const LOW_HIT_RATE: f64 = 0.5;

/// Health scores below this are flagged unhealthy.
const HEALTHY_THRESHOLD: f64 = 0.7;

// == Cache Engine ==
/// The orchestrator. All operations require the `Ready` state and fail with a
/// not-ready error otherwise.
#[derive(Debug)]
pub struct CacheEngine {
    config: RwLock<CacheConfig>,
    state: RwLock<EngineState>,
    memory: RwLock<MemoryTier>,
    disk: RwLock<Option<DiskTier>>,
    metrics: Mutex<EngineMetrics>,
}

impl CacheEngine {
    // == Constructor ==
    /// Creates an uninitialized engine. Call `initialize` before use.
    pub fn new(config: CacheConfig) -> Self {
        let memory = MemoryTier::new(config.max_memory_size, config.eviction_policy);
        Self {
            config: RwLock::new(config),
            state: RwLock::new(EngineState::Uninitialized),
            memory: RwLock::new(memory),
            disk: RwLock::new(None),
            metrics: Mutex::new(EngineMetrics::new()),
        }
    }

    // == Initialize ==
    /// Opens the disk tier and moves the engine to `Ready`. Failure to set up
    /// the directory structure moves the engine to `Error`, which surfaces as
    /// not-ready for every subsequent call.
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            match *state {
                EngineState::Uninitialized | EngineState::Error => {}
                other => {
                    return Err(CacheError::NotReady(format!(
                        "cannot initialize from state '{}'",
                        other
                    )))
                }
            }
            *state = EngineState::Initializing;
        }

        let (cache_dir, max_disk_size, policy) = {
            let config = self.config.read().await;
            (
                config.cache_dir.clone(),
                config.max_disk_size,
                config.eviction_policy,
            )
        };

        match DiskTier::open(&cache_dir, max_disk_size, policy).await {
            Ok(tier) => {
                if !tier.validate_directory().await {
                    error!(cache_dir = %cache_dir.display(), "cache directory failed validation");
                    *self.state.write().await = EngineState::Error;
                    return Err(CacheError::Storage(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("cache directory '{}' is not usable", cache_dir.display()),
                    )));
                }
                *self.disk.write().await = Some(tier);
                *self.state.write().await = EngineState::Ready;
                info!(cache_dir = %cache_dir.display(), "cache engine ready");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "cache engine initialization failed");
                *self.state.write().await = EngineState::Error;
                Err(err)
            }
        }
    }

    // == State Accessors ==
    /// Returns the current lifecycle state.
    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }

    /// Reports whether the engine accepts operations.
    pub async fn is_ready(&self) -> bool {
        self.state().await == EngineState::Ready
    }

    /// Returns the configured cleanup interval in seconds, re-read so
    /// configuration updates take effect on the next cycle.
    pub async fn cleanup_interval(&self) -> u64 {
        self.config.read().await.cleanup_interval
    }

    /// Returns a snapshot of the active configuration.
    pub async fn config_snapshot(&self) -> CacheConfig {
        self.config.read().await.clone()
    }

    async fn ensure_ready(&self) -> Result<()> {
        let state = self.state().await;
        if state == EngineState::Ready {
            Ok(())
        } else {
            Err(CacheError::NotReady(format!(
                "engine is in state '{}'",
                state
            )))
        }
    }

    // == Get ==
    /// Retrieves and decodes a value, routed by the active strategy. Under
    /// hybrid, a disk hit is promoted into the memory tier before returning,
    /// even when memory is already at capacity: the tier's own capacity pass
    /// self-corrects.
    ///
    /// A payload that fails to decode is reported as absent; the failure is
    /// local to this call.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.ensure_ready().await?;
        let start = Instant::now();
        let strategy = self.config.read().await.strategy;

        let uses_memory = matches!(
            strategy,
            CacheStrategy::MemoryOnly | CacheStrategy::Hybrid
        );
        let uses_disk = matches!(strategy, CacheStrategy::DiskOnly | CacheStrategy::Hybrid);

        let mut lookup: Option<(CacheEntry, HitTier)> = None;
        if uses_memory {
            let found = self.memory.write().await.get(key);
            lookup = found.map(|entry| (entry, HitTier::Memory));
        }
        if lookup.is_none() && uses_disk {
            if let Some(entry) = self.disk_get(key).await? {
                if strategy == CacheStrategy::Hybrid {
                    self.promote(entry.clone()).await;
                }
                lookup = Some((entry, HitTier::Disk));
            }
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        match lookup {
            Some((entry, tier)) => match serde_json::from_slice(&entry.payload) {
                Ok(value) => {
                    self.metrics.lock().await.record_hit(tier, elapsed_ms);
                    Ok(Some(value))
                }
                Err(err) => {
                    warn!(key, error = %err, "cached payload failed to decode, reporting miss");
                    self.metrics.lock().await.record_miss(elapsed_ms);
                    Ok(None)
                }
            },
            None => {
                self.metrics.lock().await.record_miss(elapsed_ms);
                Ok(None)
            }
        }
    }

    // == Set ==
    /// Encodes and stores a value, routed by the active strategy (hybrid
    /// writes both tiers). The effective TTL is the caller's value or, when
    /// absent, the configuration default; a zero default means no expiration.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<u64>) -> Result<()> {
        self.ensure_ready().await?;
        validate_key(key)?;

        let payload = serde_json::to_vec(value).map_err(|err| CacheError::Encode {
            key: key.to_string(),
            reason: err.to_string(),
        })?;

        let (strategy, effective_ttl, compression, encryption) = {
            let config = self.config.read().await;
            let default = (config.default_ttl > 0).then_some(config.default_ttl);
            (
                config.strategy,
                ttl.or(default),
                config.enable_compression,
                config.enable_encryption,
            )
        };

        let mut entry = CacheEntry::new(key.to_string(), payload, effective_ttl);
        if compression {
            entry = entry.with_metadata("compression", "requested");
        }
        if encryption {
            entry = entry.with_metadata("encryption", "requested");
        }

        let mut evicted = 0u64;
        if matches!(strategy, CacheStrategy::MemoryOnly | CacheStrategy::Hybrid) {
            evicted += self.memory.write().await.set(entry.clone()) as u64;
        }
        if matches!(strategy, CacheStrategy::DiskOnly | CacheStrategy::Hybrid) {
            let mut disk = self.disk.write().await;
            let tier = disk
                .as_mut()
                .ok_or_else(|| CacheError::NotReady("disk tier not initialized".to_string()))?;
            evicted += tier.set(&entry).await? as u64;
        }

        let mut metrics = self.metrics.lock().await;
        metrics.record_write();
        metrics.record_evictions(evicted);
        Ok(())
    }

    // == Delete ==
    /// Removes a key from every tier the strategy uses. Deleting an absent
    /// key succeeds; the result reports whether anything was removed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_ready().await?;
        let strategy = self.config.read().await.strategy;

        let mut removed = false;
        if matches!(strategy, CacheStrategy::MemoryOnly | CacheStrategy::Hybrid) {
            removed |= self.memory.write().await.delete(key);
        }
        if matches!(strategy, CacheStrategy::DiskOnly | CacheStrategy::Hybrid) {
            let mut disk = self.disk.write().await;
            let tier = disk
                .as_mut()
                .ok_or_else(|| CacheError::NotReady("disk tier not initialized".to_string()))?;
            removed |= tier.delete(key).await?;
        }

        self.metrics.lock().await.record_delete();
        Ok(removed)
    }

    // == Exists ==
    /// Reports whether a live entry exists in any tier the strategy uses,
    /// short-circuiting on the first tier that reports existence.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_ready().await?;
        let strategy = self.config.read().await.strategy;

        if matches!(strategy, CacheStrategy::MemoryOnly | CacheStrategy::Hybrid)
            && self.memory.read().await.exists(key)
        {
            return Ok(true);
        }
        if matches!(strategy, CacheStrategy::DiskOnly | CacheStrategy::Hybrid) {
            let disk = self.disk.read().await;
            let tier = disk
                .as_ref()
                .ok_or_else(|| CacheError::NotReady("disk tier not initialized".to_string()))?;
            return Ok(tier.exists(key));
        }
        Ok(false)
    }

    // == Batch Operations ==
    /// Applies `get` to each key; absent keys are simply missing from the
    /// result. No atomicity across the batch.
    pub async fn get_multiple<T: DeserializeOwned>(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, T>> {
        let mut found = HashMap::new();
        for key in keys {
            if let Some(value) = self.get(key).await? {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    /// Applies `set` to each pair, stopping at the first failure; keys
    /// processed before the failure keep their new state.
    pub async fn set_multiple<T: Serialize>(
        &self,
        entries: &[(String, T)],
        ttl: Option<u64>,
    ) -> Result<usize> {
        let mut written = 0;
        for (key, value) in entries {
            self.set(key, value, ttl).await?;
            written += 1;
        }
        Ok(written)
    }

    /// Applies `delete` to each key.
    ///
    /// # Returns
    /// The number of keys that were actually removed.
    pub async fn delete_multiple(&self, keys: &[String]) -> Result<usize> {
        let mut removed = 0;
        for key in keys {
            if self.delete(key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    // == Clear All ==
    /// Clears every tier the strategy touches.
    pub async fn clear_all(&self) -> Result<()> {
        self.ensure_ready().await?;
        let strategy = self.config.read().await.strategy;

        if matches!(strategy, CacheStrategy::MemoryOnly | CacheStrategy::Hybrid) {
            self.memory.write().await.clear_all();
        }
        if matches!(strategy, CacheStrategy::DiskOnly | CacheStrategy::Hybrid) {
            let mut disk = self.disk.write().await;
            let tier = disk
                .as_mut()
                .ok_or_else(|| CacheError::NotReady("disk tier not initialized".to_string()))?;
            tier.clear_all().await?;
        }

        self.metrics.lock().await.record_clear();
        Ok(())
    }

    // == Clear Expired ==
    /// Sweeps expired entries from both tiers regardless of strategy.
    ///
    /// # Returns
    /// The total number of entries removed.
    pub async fn clear_expired(&self) -> Result<usize> {
        self.ensure_ready().await?;

        let mut removed = self.memory.write().await.clear_expired();
        {
            let mut disk = self.disk.write().await;
            if let Some(tier) = disk.as_mut() {
                removed += tier.clear_expired().await;
            }
        }

        self.metrics.lock().await.record_expirations(removed as u64);
        Ok(removed)
    }

    // == Cleanup Cycle ==
    /// One background maintenance pass: sweep expired entries, then re-apply
    /// eviction to any tier still over capacity.
    ///
    /// # Returns
    /// The number of expired entries removed.
    pub async fn run_cleanup_cycle(&self) -> Result<usize> {
        let removed = self.clear_expired().await?;

        let mut evicted = self.memory.write().await.enforce_capacity() as u64;
        {
            let mut disk = self.disk.write().await;
            if let Some(tier) = disk.as_mut() {
                evicted += tier.enforce_capacity().await as u64;
            }
        }
        if evicted > 0 {
            self.metrics.lock().await.record_evictions(evicted);
        }

        Ok(removed)
    }

    // == Warm Cache ==
    /// Best-effort bulk load. Individual failures are swallowed and counted;
    /// warming never fails the caller.
    ///
    /// # Returns
    /// `(loaded, failed)` entry counts.
    pub async fn warm_cache<T: Serialize>(
        &self,
        entries: &[(String, T, Option<u64>)],
    ) -> (usize, usize) {
        let mut loaded = 0;
        let mut failed = 0;
        for (key, value, ttl) in entries {
            match self.set(key, value, *ttl).await {
                Ok(()) => loaded += 1,
                Err(err) => {
                    debug!(key = %key, error = %err, "cache warming entry skipped");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            warn!(loaded, failed, "cache warming finished with failures");
        } else {
            info!(loaded, "cache warming finished");
        }
        (loaded, failed)
    }

    // == Statistics ==
    /// Returns a point-in-time snapshot of the engine counters and per-tier
    /// occupancy.
    pub async fn get_statistics(&self) -> Result<CacheStatistics> {
        self.ensure_ready().await?;

        let metrics = self.metrics.lock().await.clone();
        let (memory_entries, memory_size, memory_max) = {
            let memory = self.memory.read().await;
            (memory.entry_count(), memory.current_size(), memory.max_size())
        };
        let (disk_entries, disk_size, disk_max) = {
            let disk = self.disk.read().await;
            match disk.as_ref() {
                Some(tier) => (tier.entry_count(), tier.current_size(), tier.max_size()),
                None => (0, 0, 0),
            }
        };

        Ok(CacheStatistics {
            total_requests: metrics.total_requests,
            memory_hits: metrics.memory_hits,
            disk_hits: metrics.disk_hits,
            misses: metrics.misses,
            hit_rate: metrics.hit_rate(),
            writes: metrics.writes,
            deletes: metrics.deletes,
            evictions: metrics.evictions,
            expirations: metrics.expirations,
            clear_operations: metrics.clear_operations,
            avg_response_time_ms: metrics.avg_response_time_ms,
            memory_entries,
            memory_size_bytes: memory_size,
            memory_max_bytes: memory_max,
            disk_entries,
            disk_size_bytes: disk_size,
            disk_max_bytes: disk_max,
        })
    }

    // == Health ==
    /// Scores cache health from the hit rate and the worse of the two tiers'
    /// utilization ratios, with recommendations drawn from whichever factor
    /// dominates.
    pub async fn get_cache_health(&self) -> Result<CacheHealth> {
        let stats = self.get_statistics().await?;

        let memory_utilization = utilization(stats.memory_size_bytes, stats.memory_max_bytes);
        let disk_utilization = utilization(stats.disk_size_bytes, stats.disk_max_bytes);
        let worst = memory_utilization.max(disk_utilization);
        let score = 0.6 * stats.hit_rate + 0.4 * (1.0 - worst);
        let healthy = score >= HEALTHY_THRESHOLD;

        let mut recommendations = Vec::new();
        if !healthy && stats.hit_rate < LOW_HIT_RATE {
            recommendations.push(
                "Hit rate is low: review TTL settings or warm the cache with frequently used keys"
                    .to_string(),
            );
        }
        if memory_utilization > HIGH_UTILIZATION {
            recommendations.push(
                "Memory tier is near capacity: raise MAX_MEMORY_SIZE or tighten TTLs".to_string(),
            );
        }
        if disk_utilization > HIGH_UTILIZATION {
            recommendations.push(
                "Disk tier is near capacity: raise MAX_DISK_SIZE or reduce cached payload sizes"
                    .to_string(),
            );
        }

        Ok(CacheHealth {
            score,
            healthy,
            hit_rate: stats.hit_rate,
            memory_utilization,
            disk_utilization,
            recommendations,
        })
    }

    // == Update Configuration ==
    /// Swaps the configuration and propagates the new ceilings and policy to
    /// both tiers, which may evict immediately if a new ceiling is smaller
    /// than current usage. The disk tier keeps its original root directory.
    pub async fn update_configuration(&self, mut new_config: CacheConfig) -> Result<()> {
        self.ensure_ready().await?;

        let mut evicted = 0u64;
        {
            let mut memory = self.memory.write().await;
            memory.set_policy(new_config.eviction_policy);
            evicted += memory.update_max_size(new_config.max_memory_size) as u64;
        }
        {
            let mut disk = self.disk.write().await;
            if let Some(tier) = disk.as_mut() {
                tier.set_policy(new_config.eviction_policy);
                evicted += tier.update_max_size(new_config.max_disk_size).await? as u64;
            }
        }

        {
            let mut config = self.config.write().await;
            if new_config.cache_dir != config.cache_dir {
                warn!(
                    requested = %new_config.cache_dir.display(),
                    active = %config.cache_dir.display(),
                    "cache directory cannot change at runtime, keeping active directory"
                );
                new_config.cache_dir = config.cache_dir.clone();
            }
            *config = new_config;
        }

        if evicted > 0 {
            self.metrics.lock().await.record_evictions(evicted);
        }
        info!("cache configuration updated");
        Ok(())
    }

    // == Shutdown ==
    /// Terminal teardown: clears both tiers and stops accepting operations.
    /// The background cleanup loop observes the state change and exits.
    pub async fn shutdown(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state == EngineState::Shutdown {
                return Ok(());
            }
            *state = EngineState::Shutdown;
        }

        self.memory.write().await.clear_all();
        {
            let mut disk = self.disk.write().await;
            if let Some(tier) = disk.as_mut() {
                if let Err(err) = tier.clear_all().await {
                    warn!(error = %err, "disk tier clear failed during shutdown");
                }
            }
        }

        info!("cache engine shut down");
        Ok(())
    }

    // == Internals ==
    /// Disk lookup with the not-ready guard folded in.
    async fn disk_get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut disk = self.disk.write().await;
        let tier = disk
            .as_mut()
            .ok_or_else(|| CacheError::NotReady("disk tier not initialized".to_string()))?;
        Ok(tier.get(key).await)
    }

    /// Writes a disk hit back into the memory tier (hybrid strategy).
    async fn promote(&self, entry: CacheEntry) {
        debug!(key = %entry.key, "promoting disk hit into memory tier");
        let evicted = self.memory.write().await.set(entry);
        if evicted > 0 {
            self.metrics.lock().await.record_evictions(evicted as u64);
        }
    }
}

fn utilization(used: u64, max: u64) -> f64 {
    if max == 0 {
        0.0
    } else {
        (used as f64 / max as f64).min(1.0)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
