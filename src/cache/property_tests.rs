//! Property-Based Tests for the Cache Tiers
//!
//! Uses proptest to verify correctness properties of the memory tier and the
//! eviction policies under arbitrary operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;

use crate::cache::entry::CacheEntry;
use crate::cache::eviction::{select_victims, EvictionCandidate, EvictionPolicy};
use crate::cache::memory::MemoryTier;

// == Test Configuration ==
const TEST_MAX_SIZE: u64 = 64 * 1024;

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}"
}

/// Generates payloads of varied sizes
fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Generates a sequence of tier operations for testing
#[derive(Debug, Clone)]
enum TierOp {
    Set { key: String, payload: Vec<u8> },
    Get { key: String },
    Delete { key: String },
}

fn tier_op_strategy() -> impl Strategy<Value = TierOp> {
    prop_oneof![
        (valid_key_strategy(), payload_strategy())
            .prop_map(|(key, payload)| TierOp::Set { key, payload }),
        valid_key_strategy().prop_map(|key| TierOp::Get { key }),
        valid_key_strategy().prop_map(|key| TierOp::Delete { key }),
    ]
}

fn eviction_policy_strategy() -> impl Strategy<Value = EvictionPolicy> {
    prop_oneof![
        Just(EvictionPolicy::Lru),
        Just(EvictionPolicy::Lfu),
        Just(EvictionPolicy::Fifo),
        Just(EvictionPolicy::Random),
    ]
}

fn candidate_strategy() -> impl Strategy<Value = EvictionCandidate> {
    (
        valid_key_strategy(),
        1u64..2048,
        0u64..1_000_000,
        0u64..1_000_000,
        1u64..1000,
    )
        .prop_map(|(key, size, created, accessed, count)| EvictionCandidate {
            key,
            size,
            created_at: created,
            last_accessed_at: accessed,
            access_count: count,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Round-trip: storing a payload and retrieving it before expiration
    // returns the exact bytes that were stored.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), payload in payload_strategy()) {
        let mut tier = MemoryTier::new(TEST_MAX_SIZE, EvictionPolicy::Lru);

        tier.set(CacheEntry::new(key.clone(), payload.clone(), None));

        let retrieved = tier.get(&key).unwrap();
        prop_assert_eq!(retrieved.payload, payload, "Round-trip payload mismatch");
    }

    // Delete removes the entry: after a delete, a get misses.
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), payload in payload_strategy()) {
        let mut tier = MemoryTier::new(TEST_MAX_SIZE, EvictionPolicy::Lru);

        tier.set(CacheEntry::new(key.clone(), payload, None));
        prop_assert!(tier.get(&key).is_some(), "Key should exist before delete");

        tier.delete(&key);
        prop_assert!(tier.get(&key).is_none(), "Key should not exist after delete");
    }

    // Overwrite semantics: storing V1 then V2 under the same key yields V2.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        first in payload_strategy(),
        second in payload_strategy(),
    ) {
        let mut tier = MemoryTier::new(TEST_MAX_SIZE, EvictionPolicy::Lru);

        tier.set(CacheEntry::new(key.clone(), first, None));
        tier.set(CacheEntry::new(key.clone(), second.clone(), None));

        let retrieved = tier.get(&key).unwrap();
        prop_assert_eq!(retrieved.payload, second, "Overwrite did not win");
    }

    // Capacity invariant: no operation sequence ever leaves the tier over its
    // ceiling once the mutation returns, under any policy.
    #[test]
    fn prop_capacity_invariant(
        ops in prop::collection::vec(tier_op_strategy(), 1..60),
        policy in eviction_policy_strategy(),
    ) {
        // Small ceiling so eviction actually triggers
        let mut tier = MemoryTier::new(4 * 1024, policy);

        for op in ops {
            match op {
                TierOp::Set { key, payload } => {
                    tier.set(CacheEntry::new(key, payload, None));
                }
                TierOp::Get { key } => {
                    let _ = tier.get(&key);
                }
                TierOp::Delete { key } => {
                    let _ = tier.delete(&key);
                }
            }
            prop_assert!(
                tier.current_size() <= tier.max_size(),
                "Tier over capacity: {} > {}",
                tier.current_size(),
                tier.max_size()
            );
        }
    }

    // Victim selection frees at least the target (or exhausts the tier), and
    // never names a key twice.
    #[test]
    fn prop_victims_meet_relief_target(
        candidates in prop::collection::vec(candidate_strategy(), 0..40),
        policy in eviction_policy_strategy(),
        target in 0u64..16 * 1024,
    ) {
        // Keys must be unique for the freed-size arithmetic to hold
        let mut seen = HashSet::new();
        let candidates: Vec<EvictionCandidate> = candidates
            .into_iter()
            .filter(|c| seen.insert(c.key.clone()))
            .collect();

        let victims = select_victims(&candidates, policy, target);

        let unique: HashSet<&String> = victims.iter().collect();
        prop_assert_eq!(unique.len(), victims.len(), "Duplicate victims selected");

        let total: u64 = candidates.iter().map(|c| c.size).sum();
        let freed: u64 = candidates
            .iter()
            .filter(|c| unique.contains(&c.key))
            .map(|c| c.size)
            .sum();

        if target == 0 || candidates.is_empty() {
            prop_assert!(victims.is_empty());
        } else if total < target {
            prop_assert_eq!(victims.len(), candidates.len(), "Unreachable target must select all");
        } else {
            prop_assert!(freed >= target, "Freed {} of target {}", freed, target);
        }
    }
}
