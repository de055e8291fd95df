//! Process-wide `tracing` subscriber.
//!
//! Logs go to stderr; stdout is reserved for command output and the stdout
//! transport.

use safecity_core::config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::DaemonError;

/// `RUST_LOG` wins over the configured level when it is set and valid.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, DaemonError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => filter_for_level(&config.level),
    }
}

pub fn filter_for_level(level: &str) -> Result<EnvFilter, DaemonError> {
    EnvFilter::try_new(level)
        .map_err(|err| DaemonError::Telemetry(format!("invalid log level '{level}': {err}")))
}

pub fn init_tracing(config: &LoggingConfig) -> Result<(), DaemonError> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|err| DaemonError::Telemetry(err.to_string()))
}
