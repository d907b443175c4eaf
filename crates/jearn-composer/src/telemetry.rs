//! Tracing setup for binaries and tests that embed the composer.
//!
//! The library itself only emits `tracing` events; call [`init`] once at
//! startup to get them on the console.
//!
//! ```ignore
//! use jearn_composer::telemetry::{self, TelemetryConfig};
//!
//! telemetry::init(TelemetryConfig::from_env("composer-demo"));
//! tracing::info!("composer ready");
//! ```

use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name, attached to the startup event.
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    /// Load config from environment variables.
    ///
    /// - `RUST_LOG`: Standard env filter (optional, overrides console_level)
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
        }
    }
}

/// Install the console subscriber. Later calls are no-ops.
pub fn init(config: TelemetryConfig) {
    INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_filter(env_filter);

        // another subscriber may already be installed by the host
        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_ok()
        {
            tracing::debug!(service = %config.service_name, "telemetry initialized");
        }
    });
}
