//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies. Statistics are
//! served as the engine's own snapshot type; everything else gets a small
//! wrapper here.

use serde::Serialize;

use crate::cache::CacheHealth;
use crate::config::CacheConfig;

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: serde_json::Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
///
/// Deletes are idempotent, so the response reports whether anything was
/// actually removed instead of failing on absent keys.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
    /// Whether an entry was actually removed
    pub removed: bool,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>, removed: bool) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
            removed,
        }
    }
}

/// Response body for the exists operation (GET /exists/:key)
#[derive(Debug, Clone, Serialize)]
pub struct ExistsResponse {
    pub key: String,
    pub exists: bool,
}

impl ExistsResponse {
    /// Creates a new ExistsResponse
    pub fn new(key: impl Into<String>, exists: bool) -> Self {
        Self {
            key: key.into(),
            exists,
        }
    }
}

/// Response body for the clear operation (POST /clear)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for the warm operation (POST /warm)
#[derive(Debug, Clone, Serialize)]
pub struct WarmResponse {
    /// Entries successfully loaded
    pub loaded: usize,
    /// Entries skipped because of individual failures
    pub failed: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status: "healthy" or "degraded"
    pub status: String,
    /// Weighted health score in [0, 1]
    pub score: f64,
    /// Observed hit rate
    pub hit_rate: f64,
    /// Memory tier used/max ratio
    pub memory_utilization: f64,
    /// Disk tier used/max ratio
    pub disk_utilization: f64,
    /// Suggested remediations when degraded
    pub recommendations: Vec<String>,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a HealthResponse from the engine's health assessment
    pub fn from_health(health: CacheHealth) -> Self {
        Self {
            status: if health.healthy {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            score: health.score,
            hit_rate: health.hit_rate,
            memory_utilization: health.memory_utilization,
            disk_utilization: health.disk_utilization,
            recommendations: health.recommendations,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for configuration updates (PUT /config)
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    pub message: String,
    pub strategy: String,
    pub eviction_policy: String,
    pub max_memory_size: u64,
    pub max_disk_size: u64,
    pub default_ttl: u64,
    pub cleanup_interval: u64,
}

impl ConfigResponse {
    /// Creates a ConfigResponse reflecting the active configuration
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            message: "Configuration updated".to_string(),
            strategy: config.strategy.to_string(),
            eviction_policy: format!("{:?}", config.eviction_policy).to_lowercase(),
            max_memory_size: config.max_memory_size,
            max_disk_size: config.max_disk_size,
            default_ttl: config.default_ttl,
            cleanup_interval: config.cleanup_interval,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_response_serialize() {
        let resp = GetResponse::new("test_key", serde_json::json!({"n": 1}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("test_key"));
        assert!(json.contains("\"n\":1"));
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_delete_response_reports_removal() {
        let resp = DeleteResponse::new("deleted_key", true);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("deleted_key"));
        assert!(json.contains("\"removed\":true"));
    }

    #[test]
    fn test_exists_response_serialize() {
        let resp = ExistsResponse::new("k", false);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"exists\":false"));
    }

    #[test]
    fn test_health_response_degraded() {
        let health = CacheHealth {
            score: 0.2,
            healthy: false,
            hit_rate: 0.0,
            memory_utilization: 0.9,
            disk_utilization: 0.1,
            recommendations: vec!["do something".to_string()],
        };
        let resp = HealthResponse::from_health(health);
        assert_eq!(resp.status, "degraded");
        assert_eq!(resp.recommendations.len(), 1);
        assert!(!resp.timestamp.is_empty());
    }

    #[test]
    fn test_config_response_names() {
        let resp = ConfigResponse::new(&CacheConfig::default());
        assert_eq!(resp.strategy, "hybrid");
        assert_eq!(resp.eviction_policy, "lru");
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
