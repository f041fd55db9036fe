//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries, for
//! deployments where the per-write garbage collection draw is too rare.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::FileCache;
use crate::codec::Codec;

/// Spawns a background task that periodically purges expired entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Each sweep runs on the blocking pool since it walks
/// the whole cache tree. A failed sweep is logged and retried on the next
/// tick.
///
/// # Arguments
/// * `cache` - Shared cache to sweep
/// * `sweep_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(FileCache::new(CacheConfig::new("/var/cache/app")));
/// let sweep_handle = spawn_sweep_task(cache.clone(), 60);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<C>(cache: Arc<FileCache<C>>, sweep_interval_secs: u64) -> JoinHandle<()>
where
    C: Codec + 'static,
{
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            let cache = Arc::clone(&cache);
            let result = tokio::task::spawn_blocking(move || cache.purge_expired()).await;

            match result {
                Ok(Ok(stats)) if stats.files_removed > 0 => {
                    info!("Expiry sweep: removed {} expired entries", stats.files_removed);
                }
                Ok(Ok(_)) => debug!("Expiry sweep: no expired entries found"),
                Ok(Err(e)) => warn!(error = %e, "Expiry sweep failed"),
                Err(e) => warn!(error = %e, "Expiry sweep task panicked"),
            }
        }
    })
}
