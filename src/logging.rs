//! # Logging
//!
//! `tracing` subscriber setup plus the two structured event helpers every
//! lifecycle write goes through. Filtering follows `RUST_LOG` when set,
//! otherwise the deployment environment (`REVIEW_ENV`, then `APP_ENV`).

use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

static INSTALLED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Console,
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("REVIEW_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Console,
        }
    }
}

fn deployment_environment() -> String {
    std::env::var("REVIEW_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn default_directive(environment: &str) -> &'static str {
    if environment == "production" {
        "info"
    } else {
        "debug"
    }
}

/// Install the global subscriber once. Later calls, and calls after some
/// other subscriber was installed, do nothing.
pub fn init_structured_logging() {
    INSTALLED.get_or_init(|| {
        let environment = deployment_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(&environment)));
        let format = LogFormat::from_env();

        let layer = match format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_ansi(false)
                .boxed(),
            LogFormat::Console => fmt::layer().with_target(true).with_thread_ids(true).boxed(),
        };

        if tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_err()
        {
            tracing::debug!("Subscriber already installed, keeping it");
            return;
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            format = ?format,
            "🔧 Logging initialized"
        );
    });
}

/// Lifecycle write on a task or version
pub fn log_review_operation(
    operation: &str,
    tenant_id: i64,
    task_id: Option<i64>,
    version_id: Option<i64>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        tenant_id = tenant_id,
        task_id = task_id,
        version_id = version_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 REVIEW_OPERATION"
    );
}

/// Outcome of one copy job
pub fn log_replication_operation(
    operation: &str,
    trace_id: &str,
    source_version_id: i64,
    target_version_id: i64,
    status: &str,
    file_count: Option<i64>,
) {
    tracing::info!(
        operation = %operation,
        trace_id = %trace_id,
        source_version_id = source_version_id,
        target_version_id = target_version_id,
        status = %status,
        file_count = file_count,
        timestamp = %Utc::now().to_rfc3339(),
        "📦 REPLICATION_OPERATION"
    );
}
