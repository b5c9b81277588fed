//! Logging infrastructure for the media service
//!
//! Hosts embedding the service usually bring their own subscriber. These
//! helpers are for standalone use (demos, tools, tests) and are safe to
//! skip entirely.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No output
    Silent,
    /// Compact stderr output for development
    Development,
    /// Verbose diagnostics with source locations
    Debug,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Initialize logging with the specified mode
///
/// # Environment Variables
///
/// - `MEDIA_LOG_LEVEL`: Override log level (error, warn, info, debug, trace)
/// - `RUST_LOG`: Used when `MEDIA_LOG_LEVEL` is not set
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;

            let subscriber = Registry::default()
                .with(fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact())
                .with(filter);

            subscriber.try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))?;

            Ok(())
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;

            let subscriber = Registry::default()
                .with(fmt::layer()
                    .pretty()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true))
                .with(filter);

            subscriber.try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))?;

            Ok(())
        }
    }
}

/// Parse a logging mode name
///
/// Accepts "silent", "development" and "debug".
pub fn parse_mode(value: &str) -> Result<LoggingMode, LoggingError> {
    match value {
        "silent" => Ok(LoggingMode::Silent),
        "development" => Ok(LoggingMode::Development),
        "debug" => Ok(LoggingMode::Debug),
        other => Err(LoggingError::InvalidEnv(format!("MEDIA_LOG_MODE={}", other))),
    }
}

/// Initialize logging from the `MEDIA_LOG_MODE` environment variable
///
/// Defaults to Silent when unset. An unrecognized value is an error.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var("MEDIA_LOG_MODE") {
        Ok(value) => parse_mode(&value)?,
        Err(_) => LoggingMode::Silent,
    };

    init_logging(mode)
}

/// Create an environment filter with fallback to default level
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directives = std::env::var("MEDIA_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directives)
        .map_err(|e| LoggingError::InvalidEnv(format!("{}: {}", directives, e)))
}
