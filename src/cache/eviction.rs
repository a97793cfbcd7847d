//! Eviction Policy Module
//!
//! Pure victim selection for capacity enforcement. Given a tier's candidate
//! entries and a byte relief target, ranks candidates under the configured
//! policy and returns the keys to remove. No state, no I/O.

use std::str::FromStr;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::cache::entry::CacheEntry;

// == Eviction Policy ==
/// Selects how a tier ranks entries for removal when over capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used: ascending last-access time
    #[default]
    Lru,
    /// Least frequently used: ascending access count
    Lfu,
    /// First in, first out: ascending creation time
    Fifo,
    /// Uniformly random sample without replacement
    Random,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "lfu" => Ok(EvictionPolicy::Lfu),
            "fifo" => Ok(EvictionPolicy::Fifo),
            "random" => Ok(EvictionPolicy::Random),
            other => Err(format!("Unknown eviction policy: {}", other)),
        }
    }
}

// == Eviction Candidate ==
/// The slice of entry metadata every policy needs to rank a candidate.
/// Tiers build these from their own records so victim selection never reads
/// payloads.
#[derive(Debug, Clone)]
pub struct EvictionCandidate {
    pub key: String,
    pub size: u64,
    pub created_at: u64,
    pub last_accessed_at: u64,
    pub access_count: u64,
}

impl From<&CacheEntry> for EvictionCandidate {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key.clone(),
            size: entry.size,
            created_at: entry.created_at,
            last_accessed_at: entry.last_accessed_at,
            access_count: entry.access_count,
        }
    }
}

// == Relief Target ==
/// Computes the number of bytes an eviction pass should free: at least the
/// current overflow, and no less than a quarter of the tier's current size so
/// a single pass buys meaningful headroom.
pub fn relief_target(current_size: u64, max_size: u64) -> u64 {
    let overflow = current_size.saturating_sub(max_size);
    overflow.max(current_size / 4)
}

// == Victim Selection ==
/// Returns an ordered list of keys to remove such that the cumulative freed
/// size meets or exceeds `target_bytes`, stopping as soon as it is met.
///
/// Edge cases: an empty candidate set yields an empty list; if the candidates
/// together are smaller than the target, every key is returned.
pub fn select_victims(
    candidates: &[EvictionCandidate],
    policy: EvictionPolicy,
    target_bytes: u64,
) -> Vec<String> {
    if candidates.is_empty() || target_bytes == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<&EvictionCandidate> = candidates.iter().collect();
    match policy {
        EvictionPolicy::Lru => ranked.sort_by_key(|c| c.last_accessed_at),
        EvictionPolicy::Lfu => ranked.sort_by_key(|c| c.access_count),
        EvictionPolicy::Fifo => ranked.sort_by_key(|c| c.created_at),
        EvictionPolicy::Random => ranked.shuffle(&mut rand::thread_rng()),
    }

    let mut victims = Vec::new();
    let mut freed: u64 = 0;
    for candidate in ranked {
        if freed >= target_bytes {
            break;
        }
        freed += candidate.size;
        victims.push(candidate.key.clone());
    }
    victims
}
