//! # Review Worker
//!
//! Standalone process consuming copy jobs and reaping stale copies.
//!
//! ## Usage
//!
//! ```bash
//! # Run with config/review.toml
//! cargo run --bin review-worker
//!
//! # Point at another config file and override a key
//! REVIEW_CONFIG_PATH=/etc/review/worker.toml \
//! REVIEW__WORKER__MAX_CONCURRENT_JOBS=16 cargo run --bin review-worker
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use review_core::logging;
use review_core::services::InMemoryReviewerDirectory;
use review_core::{ConfigManager, SystemContext};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    info!("🚀 Starting Review Worker...");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "   Build Mode: {}",
        if cfg!(debug_assertions) {
            "Debug"
        } else {
            "Release"
        }
    );

    let config_manager = ConfigManager::load().context("failed to load configuration")?;
    info!(
        environment = %config_manager.environment(),
        config = %config_manager.debug_config(),
        "🔧 Configuration loaded"
    );

    // The worker never resolves users; the directory is only needed by
    // request-path services
    let context = SystemContext::from_config(
        config_manager.clone(),
        Arc::new(InMemoryReviewerDirectory::new()),
    )
    .await
    .context("failed to build system context")?;

    let health = context.health_check().await;
    if !health.is_ready() {
        anyhow::bail!("backends not ready: {health:?}");
    }

    let consumer = context.copy_job_consumer();
    let consumer_handle = consumer.start().context("failed to start copy job consumer")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper_handle = tokio::spawn(context.stale_copy_reaper().run(shutdown_rx));

    info!(
        system_id = %context.system_id,
        queue = %consumer.queue_name(),
        "🎉 Review Worker started, press Ctrl+C to shut down"
    );

    shutdown_signal().await;
    info!("🛑 Shutdown signal received, initiating graceful shutdown...");

    consumer.stop();
    if shutdown_tx.send(true).is_err() {
        warn!("Reaper already stopped");
    }

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        if let Err(e) = consumer_handle.await {
            error!(error = %e, "Copy job consumer task failed");
        }
        if let Err(e) = reaper_handle.await {
            error!(error = %e, "Reaper task failed");
        }
    })
    .await;
    if drained.is_err() {
        warn!(
            grace_seconds = SHUTDOWN_GRACE.as_secs(),
            "Shutdown grace period elapsed; in-flight jobs will be redelivered"
        );
    }

    let stats = consumer.stats();
    info!(
        received = stats.received,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "👋 Review Worker shutdown complete"
    );
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
