use std::io;

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::models::LoggingConfig;

/// Initialize the tracing subscriber from config.
///
/// Returns a guard that must stay alive for buffered file output to
/// flush; callers hold it for the lifetime of the process.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let default_level = parse_log_level(&config.level)?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    if let Some(ref log_dir) = config.directory {
        let file_appender = rolling::daily(log_dir, "foreman.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        // File output stays JSON regardless of the stderr format.
        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_target(true);

        if config.format == "json" {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_target(true)
                .with_filter(env_filter);
            tracing_subscriber::registry()
                .with(file_layer)
                .with(stderr_layer)
                .init();
        } else {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(env_filter);
            tracing_subscriber::registry()
                .with(file_layer)
                .with(stderr_layer)
                .init();
        }
        Ok(Some(guard))
    } else {
        if config.format == "json" {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_filter(env_filter),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(false)
                        .with_filter(env_filter),
                )
                .init();
        }
        Ok(None)
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(anyhow!("unknown log level: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert!(parse_log_level("loud").is_err());
    }
}
