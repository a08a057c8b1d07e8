//! Logging setup for the coordinator and worker processes

use pdfgrep_core::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "pdfgrep.log";

/// Parse log level from config string
fn parse_log_level(level: &str) -> tracing::Level {
  match level.to_lowercase().as_str() {
    "off" | "error" => tracing::Level::ERROR,
    "warn" => tracing::Level::WARN,
    "info" => tracing::Level::INFO,
    "debug" => tracing::Level::DEBUG,
    "trace" => tracing::Level::TRACE,
    _ => tracing::Level::WARN,
  }
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
  // RUST_LOG overrides the configured level
  EnvFilter::builder()
    .with_default_directive(parse_log_level(&config.level).into())
    .from_env_lossy()
}

/// Console logging on stderr, keeping stdout for results.
pub fn init_console_logging(config: &LoggingConfig) {
  tracing_subscriber::fmt()
    .with_env_filter(env_filter(config))
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

/// Initialize logging with config-driven settings.
///
/// With `file` enabled, logs go to a rolling `pdfgrep.log` in `log_dir`
/// instead of the console. Returns the guard that must be kept alive for the
/// duration of the program.
pub fn init_logging(config: &LoggingConfig, log_dir: &Path) -> Option<WorkerGuard> {
  if !config.file {
    init_console_logging(config);
    return None;
  }

  if std::fs::create_dir_all(log_dir).is_err() {
    // Fall back to console-only logging
    init_console_logging(config);
    return None;
  }

  let file_appender = match config.rotation.as_str() {
    "hourly" => tracing_appender::rolling::hourly(log_dir, LOG_FILE_NAME),
    "never" => tracing_appender::rolling::never(log_dir, LOG_FILE_NAME),
    _ => tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME),
  };

  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::fmt()
    .with_env_filter(env_filter(config))
    .with_target(true)
    .with_ansi(false)
    .with_writer(file_writer)
    .init();

  Some(guard)
}
