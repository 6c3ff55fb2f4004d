//! Tidecache - An in-process key-value cache
//!
//! Demonstration binary: starts a cache from environment configuration, runs a
//! few operations and keeps the background tasks alive until Ctrl+C or SIGTERM.

use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tidecache::{CacheService, Config, Ttl};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Start the cache with its janitor and backup tasks
/// 4. Restore the last backup, if one is configured
/// 5. Run a few sample operations
/// 6. Wait for SIGINT/SIGTERM, then stop the background tasks
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tidecache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tidecache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: capacity={}, default_expiration={:?}, cleanup_interval={:?}, backup={}",
        config.capacity, config.default_expiration, config.cleanup_interval, config.backup.in_use
    );

    let service = CacheService::start(&config).context("failed to start cache")?;

    match service.backup_recover() {
        Some(Ok(count)) => info!("Restored {} entries from {}", count, config.backup.path.display()),
        Some(Err(e)) => warn!("No backup restored: {}", e),
        None => {}
    }

    service.set("greeting", "hello", Ttl::Never)?;
    service.set("visits", 0u64, Ttl::Default)?;
    service.set("session", "short lived", Ttl::from(Duration::from_secs(5)))?;
    service.set_default("counter", 127i8)?;

    service.increment("visits", 1)?;
    let wrapped = service.increment_i8("counter", 1)?;
    info!("counter wrapped to {}", wrapped);

    if let Err(e) = service.add("greeting", "again", Ttl::Never) {
        info!("add refused: {}", e);
    }

    info!(
        "{} entries stored, {} of {} slots used",
        service.item_count(),
        service.used(),
        service.capacity()
    );

    shutdown_signal().await;

    if let Some(Err(e)) = service.backup_save() {
        warn!("Final backup failed: {}", e);
    }
    service.shutdown().await;

    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
}
