//! File Cache Janitor
//!
//! Long-running process that sweeps expired entries out of a file cache
//! directory shared by other processes.

use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_cache::{spawn_sweep_task, FileCache, JanitorConfig};

/// Main entry point for the janitor.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Run one expiry sweep immediately
/// 4. Start the periodic sweep task
/// 5. Stop on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "file_cache=info,file_cache_janitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting file cache janitor");

    let config = JanitorConfig::from_env();
    info!(
        "Configuration loaded: path={}, directory_level={}, sweep_interval={}s",
        config.cache.cache_path().display(),
        config.cache.directory_level,
        config.sweep_interval
    );

    let cache = Arc::new(FileCache::new(config.cache.clone()));

    let initial = {
        let cache = Arc::clone(&cache);
        tokio::task::spawn_blocking(move || cache.purge_expired()).await?
    };
    match initial {
        Ok(stats) => info!("Initial sweep removed {} expired entries", stats.files_removed),
        Err(e) => warn!(error = %e, "Initial sweep failed"),
    }

    let sweep_handle = spawn_sweep_task(cache, config.sweep_interval);
    info!("Expiry sweep task started");

    shutdown_signal().await?;

    sweep_handle.abort();
    warn!("Expiry sweep task aborted");
    info!("Janitor shutdown complete");

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = ctrl_c => {
                result?;
                info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await?;
        info!("Received Ctrl+C, initiating shutdown...");
    }

    Ok(())
}
