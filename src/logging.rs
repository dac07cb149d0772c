//! Rotating log system
//!
//! Logs to both console and daily rotating files in the configured log directory.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,flight_track_viewer=debug";

/// Initialize the logging system with rotating file logs.
///
/// The returned guard flushes the file writer when dropped; hold it for the
/// lifetime of the program.
pub fn init_logging(log_dir: &str) -> anyhow::Result<WorkerGuard> {
    let log_path = Path::new(log_dir);
    if !log_path.exists() {
        std::fs::create_dir_all(log_path)?;
    }

    // flight_track_viewer.log.YYYY-MM-DD
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "flight_track_viewer.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG overrides
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!("Logging initialized. Log directory: {}", log_dir);
    Ok(guard)
}

/// Log an error with context
#[macro_export]
macro_rules! log_error {
    ($msg:expr) => {
        tracing::error!(error = %$msg, "Error occurred");
    };
    ($msg:expr, $($field:tt)*) => {
        tracing::error!(error = %$msg, $($field)*, "Error occurred");
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
