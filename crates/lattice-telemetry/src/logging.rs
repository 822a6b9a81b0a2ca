//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::TelemetryError;

/// Install the global subscriber. Filtering follows `RUST_LOG`, with
/// `info` as the default level.
pub fn init() -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| TelemetryError::LoggingInit(err.to_string()))
}
