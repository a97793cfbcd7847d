//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `GET /exists/:key` - Check whether a key is live
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Cache health assessment
//! - `POST /clear` - Clear every tier the strategy uses
//! - `POST /warm` - Best-effort bulk load
//! - `PUT /config` - Update runtime configuration

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
