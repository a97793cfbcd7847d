//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Handlers are thin:
//! validation plus a delegation into the engine.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{CacheEngine, CacheStatistics};
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, ConfigResponse, ConfigUpdateRequest, DeleteResponse, ExistsResponse,
    GetResponse, HealthResponse, SetRequest, SetResponse, WarmRequest, WarmResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache engine; the engine serializes tier access internally
    pub engine: Arc<CacheEngine>,
}

impl AppState {
    /// Creates a new AppState around an engine.
    pub fn new(engine: Arc<CacheEngine>) -> Self {
        Self { engine }
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair in the cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.engine.set(&req.key, &req.value, req.ttl).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the cache by key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.engine.get::<serde_json::Value>(&key).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Deletes a key from the cache. Deleting an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let removed = state.engine.delete(&key).await?;

    Ok(Json(DeleteResponse::new(key, removed)))
}

/// Handler for GET /exists/:key
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ExistsResponse>> {
    let exists = state.engine.exists(&key).await?;

    Ok(Json(ExistsResponse::new(key, exists)))
}

/// Handler for GET /stats
///
/// Returns a snapshot of engine counters and per-tier occupancy.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<CacheStatistics>> {
    let stats = state.engine.get_statistics().await?;

    Ok(Json(stats))
}

/// Handler for GET /health
///
/// Returns the weighted health assessment of the cache.
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let health = state.engine.get_cache_health().await?;

    Ok(Json(HealthResponse::from_health(health)))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    state.engine.clear_all().await?;

    Ok(Json(ClearResponse::new()))
}

/// Handler for POST /warm
///
/// Best-effort bulk load; individual failures never fail the request.
pub async fn warm_handler(
    State(state): State<AppState>,
    Json(req): Json<WarmRequest>,
) -> Result<Json<WarmResponse>> {
    let entries: Vec<(String, serde_json::Value, Option<u64>)> = req
        .entries
        .into_iter()
        .map(|entry| (entry.key, entry.value, entry.ttl))
        .collect();

    let (loaded, failed) = state.engine.warm_cache(&entries).await;

    Ok(Json(WarmResponse { loaded, failed }))
}

/// Handler for PUT /config
///
/// Merges the partial update onto the active configuration and applies it,
/// which may trigger immediate eviction when ceilings shrink.
pub async fn config_handler(
    State(state): State<AppState>,
    Json(req): Json<ConfigUpdateRequest>,
) -> Result<Json<ConfigResponse>> {
    let current = state.engine.config_snapshot().await;
    let updated = req.apply_to(&current);
    state.engine.update_configuration(updated).await?;

    let active = state.engine.config_snapshot().await;
    Ok(Json(ConfigResponse::new(&active)))
}
