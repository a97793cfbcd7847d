//! Tiered Cache - A hybrid tiered cache server
//!
//! Serves a memory+disk cache engine over a REST API with TTL expiration,
//! pluggable eviction and background cleanup.

mod api;
mod cache;
mod config;
mod error;
mod models;
mod tasks;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{create_router, AppState};
use cache::CacheEngine;
use config::CacheConfig;
use tasks::spawn_cleanup_task;

/// Main entry point for the tiered cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create and initialize the cache engine (opens the disk tier)
/// 4. Start the background cleanup task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tiered Cache Server");

    // Load configuration from environment variables
    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: strategy={}, policy={:?}, max_memory={}B, max_disk={}B, default_ttl={}s, cleanup_interval={}s, port={}",
        config.strategy,
        config.eviction_policy,
        config.max_memory_size,
        config.max_disk_size,
        config.default_ttl,
        config.cleanup_interval,
        config.server_port
    );
    let server_port = config.server_port;

    // Create and initialize the cache engine
    let engine = Arc::new(CacheEngine::new(config));
    if let Err(err) = engine.initialize().await {
        error!(error = %err, "Cache engine failed to initialize");
        return Err(err).context("cache engine initialization");
    }
    info!("Cache engine initialized");

    // Start background cleanup task
    let cleanup_handle = spawn_cleanup_task(engine.clone());
    info!("Background cleanup task started");

    // Create router with all endpoints
    let app = create_router(AppState::new(engine.clone()));

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding server port")?;
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(engine, cleanup_handle))
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, tears the engine down (clearing both tiers, which also
/// stops the cleanup loop) and aborts the cleanup task handle.
async fn shutdown_signal(engine: Arc<CacheEngine>, cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Err(err) = engine.shutdown().await {
        warn!(error = %err, "Engine shutdown reported an error");
    }
    cleanup_handle.abort();
    warn!("Cleanup task stopped");
}
