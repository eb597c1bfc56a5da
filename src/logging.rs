//! Log output setup for hosts embedding the engine

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSettings;
use crate::error::{Result, RetypeError};

/// File name prefix of the rolling log files
pub const LOG_FILE_PREFIX: &str = "retype.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured filter. When a log directory is
/// configured a daily-rolling file layer is added; keep the returned guard
/// alive until shutdown so buffered lines are flushed.
pub fn init(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    let (file_layer, guard) = match &settings.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| RetypeError::Config(format!("Failed to install logger: {}", e)))?;

    tracing::debug!(filter = %settings.filter, "Logging initialized");
    Ok(guard)
}
