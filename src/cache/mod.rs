//! Cache Module
//!
//! Hybrid tiered caching: a bounded in-process memory tier and a bounded
//! persistent disk tier, orchestrated by an engine with pluggable eviction,
//! TTL expiration and strategy-selectable routing.

mod disk;
mod engine;
mod entry;
mod eviction;
mod memory;
mod metrics;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use disk::{filename_for_key, key_for_filename, DiskIndexRecord, DiskTier, INDEX_FILE_NAME};
pub use engine::{CacheEngine, CacheHealth, EngineState};
pub use entry::{current_timestamp_ms, CacheEntry, ENTRY_OVERHEAD_BYTES};
pub use eviction::{relief_target, select_victims, EvictionCandidate, EvictionPolicy};
pub use memory::MemoryTier;
pub use metrics::{CacheStatistics, EngineMetrics, HitTier};

// == Public Constants ==
/// Maximum allowed key length in bytes. Keeps the disk tier's encoded entry
/// filenames within common filesystem name limits.
pub const MAX_KEY_LENGTH: usize = 180;
