//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.
//! An entry carries an opaque serialized payload; the engine never inspects
//! the bytes it stores.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Fixed per-entry bookkeeping overhead counted into the size estimate,
/// covering timestamps, counters and map headers.
pub const ENTRY_OVERHEAD_BYTES: u64 = 120;

// == Cache Entry ==
/// Represents a single cache entry with payload and access metadata.
///
/// Entries are persisted verbatim by the disk tier, so the whole struct is
/// serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Immutable identity of the entry
    pub key: String,
    /// The serialized value; opaque to the engine
    pub payload: Vec<u8>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Number of successful reads, starts at 1 on creation
    pub access_count: u64,
    /// Timestamp of the most recent access (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Byte size estimate used for tier capacity accounting
    pub size: u64,
    /// Free-form metadata, e.g. advisory encoding hints
    pub metadata: HashMap<String, String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// The size estimate is the payload length plus the key length plus a
    /// fixed overhead, so capacity accounting never depends on re-serializing
    /// the value.
    ///
    /// # Arguments
    /// * `key` - The key the entry is stored under
    /// * `payload` - The serialized value
    /// * `ttl_seconds` - Optional TTL in seconds
    pub fn new(key: String, payload: Vec<u8>, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl_seconds.map(|ttl| now + (ttl * 1000));
        let size = payload.len() as u64 + key.len() as u64 + ENTRY_OVERHEAD_BYTES;

        Self {
            key,
            payload,
            created_at: now,
            expires_at,
            access_count: 1,
            last_accessed_at: now,
            size,
            metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry, returning the modified entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is considered expired when the current
    /// time is greater than or equal to the expiration time, so a zero TTL
    /// yields an entry that is expired on its first read.
    ///
    /// # Returns
    /// - `true` if the entry has a TTL and the current time >= expiration time
    /// - `false` if the entry has no TTL (never expires) or TTL hasn't elapsed
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Touch ==
    /// Records a successful read: bumps the access count and refreshes the
    /// last-access timestamp. Eviction policies order entries by these fields.
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = current_timestamp_ms();
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired (TTL elapsed)
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at.map(|expires| {
            let now = current_timestamp_ms();
            if expires > now {
                expires - now
            } else {
                0
            }
        })
    }

    /// Returns remaining TTL in seconds, or None if no expiration is set.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.ttl_remaining_ms().map(|ms| ms / 1000)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
