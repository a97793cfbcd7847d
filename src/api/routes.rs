//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, config_handler, delete_handler, exists_handler, get_handler, health_handler,
    set_handler, stats_handler, warm_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a key-value pair
/// - `GET /get/:key` - Retrieve a value by key
/// - `DELETE /del/:key` - Delete a key
/// - `GET /exists/:key` - Check whether a key is live
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Cache health assessment
/// - `POST /clear` - Clear every tier the strategy uses
/// - `POST /warm` - Best-effort bulk load
/// - `PUT /config` - Update runtime configuration
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/exists/:key", get(exists_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/clear", post(clear_handler))
        .route("/warm", post(warm_handler))
        .route("/config", put(config_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
