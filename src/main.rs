//! fleetwatch-api entry point: configuration loading, logging
//! initialization, bootstrap (composition root), the background
//! scheduler and auto-updater loops, and graceful shutdown handling.
//!
//! Axum router construction is the named out-of-scope HTTP transport
//! for this core and is deliberately not built here; what this binary
//! produces is the [`app_state::AppState`] a transport layer would
//! mount onto, plus the background jobs that keep it warm.

mod app_state;
mod auto_updater;
mod bootstrap;
mod config;
mod error;
mod host_source;
mod refresh_tasks;

use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::bootstrap::bootstrap;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("configuration error: {e}");
        e
    })?;

    initialize_logging();

    info!("starting fleetwatch-api");
    info!(hosts = config.hosts.len(), scheduler_enabled = config.scheduler_enabled, "configuration loaded");

    let bootstrapped = bootstrap(config).await.map_err(|e| {
        eprintln!("bootstrap failed: {e}");
        e
    })?;

    info!("fleetwatch-api is ready");

    let auto_updater_task = bootstrapped.auto_updater.map(|(auto_updater, interval_secs)| {
        let cancel = bootstrapped.cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            ticker.tick().await; // first tick fires immediately; skip it, wait a full interval
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = auto_updater.run_once().await {
                            warn!(error = %e, "auto-update pass failed");
                        }
                    }
                }
            }
        })
    });

    shutdown_signal().await;
    info!("starting graceful shutdown");

    bootstrapped.cancel.cancel();
    if let Some(task) = auto_updater_task {
        task.abort();
    }
    if let Some(handle) = bootstrapped.scheduler_handle {
        handle.shutdown().await;
    }

    info!("fleetwatch-api shut down gracefully");
    Ok(())
}

/// Initializes the tracing subscriber, selecting JSON or compact
/// formatting via `LOG_FORMAT` (defaults to pretty, matching the
/// unset-format fallback of the composition root this was grounded on).
fn initialize_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fleetwatch_api=info,kernel=info,inventory=info,scheduler=info"));

    match std::env::var("LOG_FORMAT").unwrap_or_default().as_str() {
        "json" => {
            tracing_subscriber::registry().with(env_filter).with(fmt::layer().json()).init();
        }
        "compact" => {
            tracing_subscriber::registry().with(env_filter).with(fmt::layer().compact()).init();
        }
        _ => {
            tracing_subscriber::registry().with(env_filter).with(fmt::layer().pretty()).init();
        }
    }
}

/// Waits for Ctrl+C or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("received Ctrl+C signal"),
        _ = terminate => warn!("received SIGTERM signal"),
    }
}
