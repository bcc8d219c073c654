//! # Waypoint Observability
//!
//! Centralized observability layer for the Waypoint client runtime.
//!
//! ## Design Philosophy
//!
//! The request pipeline and feature modules are **event producers**, not
//! event consumers. They receive one [`ObservabilityContext`] at
//! construction and report lifecycle progress through it. They have zero
//! knowledge of:
//!
//! - Where log lines go (`tracing` subscriber, application sink)
//! - Who consumes lifecycle events (analytics backends, debug overlays)
//! - How the policy changes at runtime (`configure` shallow-merges)
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     waypoint_observability::init("waypoint-app");
//!
//!     let observability = Arc::new(ObservabilityContext::new(
//!         ObservabilityConfig::for_environment("development"),
//!     ));
//!     // hand `observability` to the client and every module
//! }
//! ```

mod context;
mod events;

pub use context::{
    LogSink, ObservabilityConfig, ObservabilityContext, ObservabilityUpdate, SinkError,
    TelemetrySink,
};
pub use events::SdkEvent;

use serde::{Deserialize, Serialize};

/// Ordered log severity used by the runtime's own gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the `tracing` subscriber installation.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the consuming application (e.g., "waypoint-app").
    /// Included in the startup line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by the `RUST_LOG` environment variable.
    pub default_level: String,

    /// Also emit logs to stderr instead of stdout.
    pub also_stderr: bool,

    /// Logical environment name; drives [`ObservabilityConfig::for_environment`].
    pub environment: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            also_stderr: false,
            environment: "development".into(),
        }
    }
}

/// Initialize the `tracing` subscriber with default settings.
///
/// This is the zero-config entry point, called once at application startup.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the `tracing` subscriber with custom configuration.
pub fn init_with_config(config: LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_level));

    if config.also_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .init();
    }

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        "observability initialized"
    );
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn log_level_round_trips_through_serde() {
        let json = serde_json::to_string(&LogLevel::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
        let level: LogLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(level, LogLevel::Warn);
    }

    #[test]
    fn default_log_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(!config.also_stderr);
        assert_eq!(config.environment, "development");
    }
}
