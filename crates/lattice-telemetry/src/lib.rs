//! # Lattice Telemetry
//!
//! Logging initialization and the Prometheus metrics registry shared by
//! the projection subsystems.

pub mod logging;
pub mod metrics;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("logging init failed: {0}")]
    LoggingInit(String),

    #[error("metrics init failed: {0}")]
    MetricsInit(String),
}
