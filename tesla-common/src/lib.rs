//! Tesla Exporter Common Library
//!
//! This crate provides shared types and utilities for the vehicle metrics exporter:
//!
//! - [`telemetry`] - Telemetry tree model (`TelemetryValue`) parsed from vehicle data
//! - [`vehicle`] - Owner API wire types (`VehicleStatus`, `VehicleState`, token grants)
//! - [`config`] - Shared logging configuration
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod telemetry;
pub mod vehicle;

// Re-export commonly used types at the crate root
pub use config::{LogFormat, LoggingConfig};
pub use error::{Error, Result};
pub use telemetry::{TelemetryValue, current_timestamp_millis};
pub use vehicle::{
    TokenRefreshRequest, TokenResponse, VehicleListResponse, VehicleState, VehicleStatus,
    WakeResponse,
};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// # Example
///
/// ```ignore
/// use tesla_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
