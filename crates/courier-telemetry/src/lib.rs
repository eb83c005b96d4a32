//! # Courier Telemetry
//!
//! Structured logging for Courier services, built on `tracing` and
//! `tracing-subscriber`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_logging(&config).expect("Failed to init logging");
//!
//!     // Bus activity is now logged
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `courier` | Service name in log lines |
//! | `COURIER_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `COURIER_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `COURIER_JSON_LOGS` | `false` | JSON output (`true` inside containers) |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{env_filter, init_logging};

use thiserror::Error;

/// Logging initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Global subscriber already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
