//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::EvictionPolicy;

// == Cache Strategy ==
/// Selects which tier(s) participate in reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStrategy {
    /// Only the in-process memory tier is used
    MemoryOnly,
    /// Only the persistent disk tier is used
    DiskOnly,
    /// Both tiers; disk hits are promoted into memory
    #[default]
    Hybrid,
}

impl FromStr for CacheStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory-only" | "memory" => Ok(CacheStrategy::MemoryOnly),
            "disk-only" | "disk" => Ok(CacheStrategy::DiskOnly),
            "hybrid" => Ok(CacheStrategy::Hybrid),
            other => Err(format!("Unknown cache strategy: {}", other)),
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheStrategy::MemoryOnly => "memory-only",
            CacheStrategy::DiskOnly => "disk-only",
            CacheStrategy::Hybrid => "hybrid",
        };
        write!(f, "{}", name)
    }
}

// == Cache Configuration ==
/// Cache engine configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// The configuration is replaceable at runtime through the engine; replacing it
/// re-validates current tier sizes against the new ceilings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Tier routing strategy
    pub strategy: CacheStrategy,
    /// Eviction policy applied when a tier exceeds its ceiling
    pub eviction_policy: EvictionPolicy,
    /// Memory tier ceiling in bytes
    pub max_memory_size: u64,
    /// Disk tier ceiling in bytes
    pub max_disk_size: u64,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Advisory flag for the serialization collaborator; the engine itself
    /// does not compress payloads
    pub enable_compression: bool,
    /// Advisory flag for the serialization collaborator; the engine itself
    /// does not encrypt payloads
    pub enable_encryption: bool,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Root directory for the disk tier
    pub cache_dir: PathBuf,
    /// HTTP server port
    pub server_port: u16,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_STRATEGY` - Tier strategy: memory-only, disk-only, hybrid (default: hybrid)
    /// - `EVICTION_POLICY` - lru, lfu, fifo, random (default: lru)
    /// - `MAX_MEMORY_SIZE` - Memory tier ceiling in bytes (default: 52428800 = 50 MB)
    /// - `MAX_DISK_SIZE` - Disk tier ceiling in bytes (default: 209715200 = 200 MB)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `ENABLE_COMPRESSION` - Advisory compression flag (default: false)
    /// - `ENABLE_ENCRYPTION` - Advisory encryption flag (default: false)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 300)
    /// - `CACHE_DIR` - Disk tier root directory (default: ./cache_data)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        Self {
            strategy: env::var("CACHE_STRATEGY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            eviction_policy: env::var("EVICTION_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            max_memory_size: env::var("MAX_MEMORY_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50 * 1024 * 1024),
            max_disk_size: env::var("MAX_DISK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(200 * 1024 * 1024),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            enable_compression: env::var("ENABLE_COMPRESSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_encryption: env::var("ENABLE_ENCRYPTION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./cache_data")),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strategy: CacheStrategy::Hybrid,
            eviction_policy: EvictionPolicy::Lru,
            max_memory_size: 50 * 1024 * 1024,
            max_disk_size: 200 * 1024 * 1024,
            default_ttl: 3600,
            enable_compression: false,
            enable_encryption: false,
            cleanup_interval: 300,
            cache_dir: PathBuf::from("./cache_data"),
            server_port: 3000,
        }
    }
}
