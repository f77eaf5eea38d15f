//! Diagnostics go to a daily log file so they never interleave with the REPL.

use anyhow::Result;
use ghostpixel_infrastructure::{GhostPaths, ServiceType};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_PREFIX: &str = "ghostpixel.log";

/// Installs the global subscriber. Keep the guard alive until exit.
pub fn init(paths: &GhostPaths) -> Result<WorkerGuard> {
    let log_dir = paths.get_path(ServiceType::Logs)?;
    std::fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()?;

    tracing::info!(log_dir = %log_dir.display(), "[Bootstrap] Logging initialized");
    Ok(guard)
}
