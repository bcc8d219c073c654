//! Runtime-reconfigurable observability policy.
//!
//! One [`ObservabilityContext`] is constructed at application start and
//! handed to the request pipeline and to every module. There is no hidden
//! process-wide singleton: single-instance-per-process semantics are
//! obtained by constructing once at the top of the application and
//! threading the context down.

use crate::events::SdkEvent;
use crate::LogLevel;
use parking_lot::RwLock;
use std::sync::Arc;

/// Error type returned by application-supplied telemetry sinks.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Application-supplied destination for rendered log lines.
///
/// When set, lines that clear the configured minimum level are delivered
/// here instead of the `tracing` subscriber.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(LogLevel, &str) + Send + Sync,
{
    fn log(&self, level: LogLevel, message: &str) {
        self(level, message)
    }
}

/// Application-supplied destination for lifecycle events.
///
/// Sink failures are logged and swallowed; they never mask the event's
/// originating request outcome.
pub trait TelemetrySink: Send + Sync {
    fn send(&self, event: &SdkEvent) -> Result<(), SinkError>;
}

impl<F> TelemetrySink for F
where
    F: Fn(&SdkEvent) -> Result<(), SinkError> + Send + Sync,
{
    fn send(&self, event: &SdkEvent) -> Result<(), SinkError> {
        self(event)
    }
}

/// Observability policy: what gets logged, at which level, and where
/// lifecycle events are delivered.
#[derive(Clone)]
pub struct ObservabilityConfig {
    /// Master switch for log mirroring.
    pub log_enabled: bool,
    /// Minimum level a line must clear to be emitted.
    pub min_level: LogLevel,
    /// Optional custom log destination; `None` routes through `tracing`.
    pub log_sink: Option<Arc<dyn LogSink>>,
    /// Master switch for event delivery to the telemetry sink.
    pub telemetry_enabled: bool,
    /// Optional telemetry destination; without one, enabled telemetry is a no-op.
    pub telemetry_sink: Option<Arc<dyn TelemetrySink>>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_enabled: true,
            min_level: LogLevel::Info,
            log_sink: None,
            telemetry_enabled: false,
            telemetry_sink: None,
        }
    }
}

impl ObservabilityConfig {
    /// Policy defaults for a named environment: logging is enabled outside
    /// production, telemetry stays off until explicitly turned on.
    pub fn for_environment(environment: &str) -> Self {
        Self {
            log_enabled: environment != "production",
            ..Default::default()
        }
    }
}

/// A shallow-merge patch for [`ObservabilityConfig`].
///
/// `None` fields are left untouched; `Some` fields replace the current
/// value. A sink cannot be unset through a patch, only replaced.
#[derive(Clone, Default)]
pub struct ObservabilityUpdate {
    pub log_enabled: Option<bool>,
    pub min_level: Option<LogLevel>,
    pub log_sink: Option<Arc<dyn LogSink>>,
    pub telemetry_enabled: Option<bool>,
    pub telemetry_sink: Option<Arc<dyn TelemetrySink>>,
}

/// The process-level event/log emitter.
///
/// Cheap to clone via `Arc`; all emission paths take a read lock only.
pub struct ObservabilityContext {
    config: RwLock<ObservabilityConfig>,
}

impl ObservabilityContext {
    pub fn new(config: ObservabilityConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ObservabilityConfig {
        self.config.read().clone()
    }

    /// Shallow-merge `update` over the current configuration.
    ///
    /// A patch that changes nothing emits nothing. A real change emits a
    /// configuration-change event *after* the merge, so an update that
    /// installs a telemetry sink is the first event that sink receives.
    /// This is fixed behavior.
    pub fn configure(&self, update: ObservabilityUpdate) {
        let changed = {
            let mut config = self.config.write();
            let mut changed = Vec::new();

            if let Some(log_enabled) = update.log_enabled {
                if config.log_enabled != log_enabled {
                    config.log_enabled = log_enabled;
                    changed.push("log_enabled".to_string());
                }
            }
            if let Some(min_level) = update.min_level {
                if config.min_level != min_level {
                    config.min_level = min_level;
                    changed.push("min_level".to_string());
                }
            }
            if let Some(log_sink) = update.log_sink {
                if !same_sink(config.log_sink.as_ref(), &log_sink) {
                    config.log_sink = Some(log_sink);
                    changed.push("log_sink".to_string());
                }
            }
            if let Some(telemetry_enabled) = update.telemetry_enabled {
                if config.telemetry_enabled != telemetry_enabled {
                    config.telemetry_enabled = telemetry_enabled;
                    changed.push("telemetry_enabled".to_string());
                }
            }
            if let Some(telemetry_sink) = update.telemetry_sink {
                if !same_telemetry_sink(config.telemetry_sink.as_ref(), &telemetry_sink) {
                    config.telemetry_sink = Some(telemetry_sink);
                    changed.push("telemetry_sink".to_string());
                }
            }

            changed
        };

        if !changed.is_empty() {
            self.emit(SdkEvent::configuration_change(changed));
        }
    }

    /// Deliver an event to the telemetry sink (when enabled) and mirror it
    /// into logs (when the mapped level clears the minimum).
    pub fn emit(&self, event: SdkEvent) {
        let config = self.config();

        if config.telemetry_enabled {
            if let Some(sink) = &config.telemetry_sink {
                if let Err(error) = sink.send(&event) {
                    tracing::warn!(
                        event_type = event.event_type(),
                        error = %error,
                        "telemetry sink failed"
                    );
                }
            }
        }

        self.log_with(&config, event.log_level(), &event.summary());
    }

    /// Convenience emitter for application-defined events.
    pub fn custom(&self, name: &str, payload: serde_json::Value) {
        self.emit(SdkEvent::custom(name, payload));
    }

    /// Level-gated log helper honoring the custom log sink.
    pub fn log(&self, level: LogLevel, message: &str) {
        let config = self.config();
        self.log_with(&config, level, message);
    }

    fn log_with(&self, config: &ObservabilityConfig, level: LogLevel, message: &str) {
        if !config.log_enabled || level < config.min_level {
            return;
        }
        match &config.log_sink {
            Some(sink) => sink.log(level, message),
            None => match level {
                LogLevel::Debug => tracing::debug!("{message}"),
                LogLevel::Info => tracing::info!("{message}"),
                LogLevel::Warn => tracing::warn!("{message}"),
                LogLevel::Error => tracing::error!("{message}"),
            },
        }
    }
}

impl Default for ObservabilityContext {
    fn default() -> Self {
        Self::new(ObservabilityConfig::default())
    }
}

fn same_sink(current: Option<&Arc<dyn LogSink>>, next: &Arc<dyn LogSink>) -> bool {
    current.is_some_and(|current| Arc::ptr_eq(current, next))
}

fn same_telemetry_sink(
    current: Option<&Arc<dyn TelemetrySink>>,
    next: &Arc<dyn TelemetrySink>,
) -> bool {
    current.is_some_and(|current| Arc::ptr_eq(current, next))
}
