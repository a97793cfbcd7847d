//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::{EvictionPolicy, MAX_KEY_LENGTH};
use crate::config::{CacheConfig, CacheStrategy};

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store (any JSON value)
/// - `ttl`: Optional TTL in seconds (uses the configured default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: serde_json::Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

/// One entry of a cache-warming request
#[derive(Debug, Clone, Deserialize)]
pub struct WarmEntry {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Request body for the warm operation (POST /warm)
///
/// Warming is best effort: entries that fail to store are counted, never
/// surfaced as a request failure.
#[derive(Debug, Clone, Deserialize)]
pub struct WarmRequest {
    pub entries: Vec<WarmEntry>,
}

/// Request body for runtime configuration updates (PUT /config)
///
/// Every field is optional; omitted fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdateRequest {
    #[serde(default)]
    pub strategy: Option<CacheStrategy>,
    #[serde(default)]
    pub eviction_policy: Option<EvictionPolicy>,
    #[serde(default)]
    pub max_memory_size: Option<u64>,
    #[serde(default)]
    pub max_disk_size: Option<u64>,
    #[serde(default)]
    pub default_ttl: Option<u64>,
    #[serde(default)]
    pub cleanup_interval: Option<u64>,
    #[serde(default)]
    pub enable_compression: Option<bool>,
    #[serde(default)]
    pub enable_encryption: Option<bool>,
}

impl ConfigUpdateRequest {
    /// Merges this update onto the currently active configuration.
    pub fn apply_to(&self, current: &CacheConfig) -> CacheConfig {
        let mut config = current.clone();
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(policy) = self.eviction_policy {
            config.eviction_policy = policy;
        }
        if let Some(bytes) = self.max_memory_size {
            config.max_memory_size = bytes;
        }
        if let Some(bytes) = self.max_disk_size {
            config.max_disk_size = bytes;
        }
        if let Some(ttl) = self.default_ttl {
            config.default_ttl = ttl;
        }
        if let Some(interval) = self.cleanup_interval {
            config.cleanup_interval = interval;
        }
        if let Some(flag) = self.enable_compression {
            config.enable_compression = flag;
        }
        if let Some(flag) = self.enable_encryption {
            config.enable_encryption = flag;
        }
        config
    }
}

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": "hello"}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, serde_json::json!("hello"));
        assert!(req.ttl.is_none());
    }

    #[test]
    fn test_set_request_with_structured_value() {
        let json = r#"{"key": "test", "value": {"answer": 42}, "ttl": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
        assert_eq!(req.value["answer"], 42);
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            value: serde_json::json!("test"),
            ttl: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_overlong_key() {
        let req = SetRequest {
            key: "x".repeat(MAX_KEY_LENGTH + 1),
            value: serde_json::json!("test"),
            ttl: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = SetRequest {
            key: "valid_key".to_string(),
            value: serde_json::json!([1, 2, 3]),
            ttl: Some(60),
        };
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_warm_request_deserialize() {
        let json = r#"{"entries": [{"key": "a", "value": 1}, {"key": "b", "value": 2, "ttl": 30}]}"#;
        let req: WarmRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.entries.len(), 2);
        assert_eq!(req.entries[1].ttl, Some(30));
    }

    #[test]
    fn test_config_update_merges_onto_current() {
        let json = r#"{"eviction_policy": "lfu", "max_memory_size": 1024}"#;
        let req: ConfigUpdateRequest = serde_json::from_str(json).unwrap();

        let current = CacheConfig::default();
        let merged = req.apply_to(&current);

        assert_eq!(merged.eviction_policy, EvictionPolicy::Lfu);
        assert_eq!(merged.max_memory_size, 1024);
        // Untouched fields keep their current values
        assert_eq!(merged.strategy, current.strategy);
        assert_eq!(merged.default_ttl, current.default_ttl);
    }

    #[test]
    fn test_config_update_strategy_names() {
        let json = r#"{"strategy": "memory-only"}"#;
        let req: ConfigUpdateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.strategy, Some(CacheStrategy::MemoryOnly));
    }
}
