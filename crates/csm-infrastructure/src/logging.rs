//! Structured logging via `tracing`.
//!
//! Logs are written to stderr, never stdout: the MCP stdio transport uses
//! stdout exclusively for JSON-RPC frames.

use csm_domain::error::{Error, Result};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub use crate::config::types::LoggingConfig;

/// Initializes the global `tracing` subscriber from `config`.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.log_level)?;
    let filter = create_log_filter(&config.log_level);

    if config.json {
        init_json_logging(filter)?;
    } else {
        init_text_logging(filter)?;
    }

    info!(level = %level, "logging initialized");
    Ok(())
}

fn create_log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env("CSM_LOG").unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_json_logging(filter: EnvFilter) -> Result<()> {
    let stderr = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    Registry::default().with(filter).with(stderr).init();
    Ok(())
}

fn init_text_logging(filter: EnvFilter) -> Result<()> {
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    Registry::default().with(filter).with(stderr).init();
    Ok(())
}

/// Parses a log-level string into a `tracing::Level`.
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(Error::configuration(format!(
            "invalid log level: {other}. Use trace, debug, info, warn, or error"
        ))),
    }
}

/// Logs whether a configuration file was found at `config_path`.
pub fn log_config_loaded(config_path: &std::path::Path, success: bool) {
    if success {
        info!(path = %config_path.display(), "configuration loaded");
    } else {
        warn!(path = %config_path.display(), "configuration file not found");
    }
}

/// Logs a component health-check result.
pub fn log_health_check(component: &str, healthy: bool, details: Option<&str>) {
    if healthy {
        debug!(component, "health check passed");
    } else {
        error!(
            component,
            details = details.unwrap_or("unknown failure"),
            "health check failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(parse_log_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(parse_log_level("verbose").is_err());
    }
}
