//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheEngine;

/// Spawns a background task that periodically purges expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between runs. Entries are otherwise reaped lazily on `get`, so this only
/// bounds how long dead entries linger in `keys()` and the snapshot.
///
/// # Arguments
/// * `cache` - Handle to the cache engine
/// * `cleanup_interval_secs` - Interval in seconds between cleanup runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cleanup_handle = spawn_cleanup_task(engine.clone(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: CacheEngine, cleanup_interval_secs: u64) -> JoinHandle<()> {
    spawn_cleanup_task_every(cache, Duration::from_secs(cleanup_interval_secs))
}

/// Same as [`spawn_cleanup_task`] with an arbitrary interval.
pub fn spawn_cleanup_task_every(cache: CacheEngine, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            match cache.purge_expired().await {
                Ok(0) => debug!("TTL cleanup: no expired entries found"),
                Ok(removed) => info!("TTL cleanup: removed {} expired entries", removed),
                Err(err) => warn!(error = %err, "TTL cleanup: snapshot not persisted"),
            }
        }
    })
}
