//! Cache Cleanup Task
//!
//! Background task that periodically sweeps expired entries from both tiers
//! and re-applies eviction to any tier still over capacity.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheEngine;

/// Spawns the background cleanup loop.
///
/// The task sleeps for the engine's configured cleanup interval between
/// passes, re-reading the interval each cycle so configuration updates take
/// effect without a restart. The loop exits on its own as soon as the engine
/// leaves the ready state; the handle can also be aborted during shutdown.
///
/// # Arguments
/// * `engine` - Shared reference to the cache engine
///
/// # Returns
/// A JoinHandle for the spawned task.
pub fn spawn_cleanup_task(engine: Arc<CacheEngine>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting cache cleanup task");

        loop {
            let interval = engine.cleanup_interval().await;
            tokio::time::sleep(Duration::from_secs(interval)).await;

            if !engine.is_ready().await {
                info!("Engine left ready state, stopping cleanup task");
                break;
            }

            match engine.run_cleanup_cycle().await {
                Ok(removed) if removed > 0 => {
                    info!("Cleanup pass removed {} expired entries", removed);
                }
                Ok(_) => {
                    debug!("Cleanup pass found no expired entries");
                }
                Err(err) => {
                    warn!(error = %err, "Cleanup pass failed");
                }
            }
        }
    })
}
