//! Logging system initialization
//!
//! Sets up the tracing subscriber from the loaded configuration.

use crate::config::LoggingConfig;

/// Initialize the logging system.
///
/// Call once during startup, after configuration is loaded. The
/// returned guard must be kept alive for the duration of the program
/// so non-blocking log writes are flushed.
///
/// # Panics
/// * If the log file cannot be opened
/// * If a global subscriber is already set
pub fn init_logging(config: &LoggingConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let writer: Box<dyn std::io::Write + Send + Sync> = match config.file {
        Some(ref log_file) if !log_file.is_empty() => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .expect("Failed to open log file");
            Box::new(file)
        }
        _ => Box::new(std::io::stdout()),
    };

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);
    let filter = tracing_subscriber::EnvFilter::new(config.level.clone());

    tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(config.file.as_ref().is_none_or(|f| f.is_empty()))
        .init();

    guard
}
