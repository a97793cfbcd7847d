//! Memory Tier Module
//!
//! In-process bounded store keyed by string. Capacity is enforced
//! synchronously inside `set`, so the tier is never over its ceiling once a
//! mutation returns. The engine serializes all access behind a single lock;
//! within that isolation domain every method here is plain synchronous code.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::entry::CacheEntry;
use crate::cache::eviction::{relief_target, select_victims, EvictionCandidate, EvictionPolicy};

// == Memory Tier ==
/// Bounded in-memory store with byte-size accounting and lazy expiration.
#[derive(Debug)]
pub struct MemoryTier {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Sum of entry size estimates currently held
    current_size: u64,
    /// Configured ceiling in bytes
    max_size: u64,
    /// Policy applied when a mutation leaves the tier over capacity
    policy: EvictionPolicy,
}

impl MemoryTier {
    // == Constructor ==
    /// Creates a new MemoryTier with the given ceiling and eviction policy.
    pub fn new(max_size: u64, policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            current_size: 0,
            max_size,
            policy,
        }
    }

    // == Get ==
    /// Retrieves an entry by key, refreshing its access statistics.
    ///
    /// An expired entry is removed on sight and reported as absent; no
    /// background scan is needed for correctness, only for space reclamation.
    pub fn get(&mut self, key: &str) -> Option<CacheEntry> {
        match self.entries.get_mut(key) {
            Some(entry) if entry.is_expired() => {
                debug!(key, "memory tier dropping expired entry on get");
                self.remove_entry(key);
                None
            }
            Some(entry) => {
                entry.touch();
                Some(entry.clone())
            }
            None => None,
        }
    }

    // == Set ==
    /// Stores an entry, replacing any existing entry for the key and
    /// adjusting size accounting by the delta. If the tier then exceeds its
    /// ceiling, eviction runs within the same mutation.
    ///
    /// # Returns
    /// The number of entries evicted to restore capacity.
    pub fn set(&mut self, entry: CacheEntry) -> usize {
        if let Some(old) = self.entries.remove(&entry.key) {
            self.current_size -= old.size;
        }
        self.current_size += entry.size;
        self.entries.insert(entry.key.clone(), entry);

        self.enforce_capacity()
    }

    // == Delete ==
    /// Removes an entry by key. Deleting an absent key is a successful no-op.
    ///
    /// # Returns
    /// `true` if an entry was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Exists ==
    /// Reports whether a live (non-expired) entry is present. Does not touch
    /// access statistics.
    pub fn exists(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    // == Clear All ==
    /// Removes every entry and resets size accounting.
    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.current_size = 0;
    }

    // == Clear Expired ==
    /// Removes all expired entries.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn clear_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.remove_entry(&key);
        }
        count
    }

    // == Keys For Eviction ==
    /// Previews which keys the given policy would remove to free the standard
    /// relief target, without mutating the tier.
    pub fn keys_for_eviction(&self, policy: EvictionPolicy) -> Vec<String> {
        let candidates = self.candidates();
        let target = relief_target(self.current_size, self.max_size);
        select_victims(&candidates, policy, target)
    }

    // == Update Max Size ==
    /// Replaces the ceiling, evicting immediately if current usage exceeds it.
    ///
    /// # Returns
    /// The number of entries evicted.
    pub fn update_max_size(&mut self, max_size: u64) -> usize {
        self.max_size = max_size;
        self.enforce_capacity()
    }

    /// Replaces the eviction policy used by capacity enforcement.
    pub fn set_policy(&mut self, policy: EvictionPolicy) {
        self.policy = policy;
    }

    // == Enforce Capacity ==
    /// Evicts entries until the tier fits its ceiling.
    ///
    /// # Returns
    /// The number of entries evicted.
    pub fn enforce_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.current_size > self.max_size && !self.entries.is_empty() {
            let candidates = self.candidates();
            let target = relief_target(self.current_size, self.max_size);
            let victims = select_victims(&candidates, self.policy, target);
            if victims.is_empty() {
                break;
            }
            for key in victims {
                if self.remove_entry(&key) {
                    evicted += 1;
                }
            }
        }
        if evicted > 0 {
            debug!(
                evicted,
                current_size = self.current_size,
                max_size = self.max_size,
                "memory tier eviction pass complete"
            );
        }
        evicted
    }

    // == Accessors ==
    /// Returns the sum of entry size estimates currently held.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Returns the configured ceiling in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Returns the current number of entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    // == Internals ==
    fn candidates(&self) -> Vec<EvictionCandidate> {
        self.entries.values().map(EvictionCandidate::from).collect()
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        if let Some(entry) = self.entries.remove(key) {
            self.current_size -= entry.size;
            true
        } else {
            false
        }
    }
}
