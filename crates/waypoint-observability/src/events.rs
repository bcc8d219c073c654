//! Lifecycle event model for the client runtime.
//!
//! Every event carries a UTC timestamp and a kebab-case `type` tag on the
//! wire, so application telemetry sinks can route on the tag alone.

use crate::LogLevel;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// A structured lifecycle event emitted by the request pipeline and by
/// feature modules.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SdkEvent {
    /// A pipeline call began. Emitted exactly once per logical call.
    RequestStart {
        timestamp: DateTime<Utc>,
        method: String,
        path: String,
        version: String,
        operation_id: String,
    },
    /// A physical attempt finished with a success status and a parsed body.
    RequestEnd {
        timestamp: DateTime<Utc>,
        method: String,
        path: String,
        version: String,
        operation_id: String,
        status: u16,
        duration_ms: u64,
    },
    /// A physical attempt failed. Retried attempts each emit their own
    /// error event before the controller retries.
    RequestError {
        timestamp: DateTime<Utc>,
        method: String,
        path: String,
        version: String,
        operation_id: String,
        status: Option<u16>,
        code: String,
        message: String,
        duration_ms: u64,
    },
    /// A live-update subscription was registered.
    SubscriptionStart {
        timestamp: DateTime<Utc>,
        channel: String,
    },
    /// A live-update subscription was torn down.
    SubscriptionEnd {
        timestamp: DateTime<Utc>,
        channel: String,
    },
    /// A live-update subscription failed.
    SubscriptionError {
        timestamp: DateTime<Utc>,
        channel: String,
        message: String,
    },
    /// A rate-limited attempt is about to back off before retrying.
    RateLimitHit {
        timestamp: DateTime<Utc>,
        operation_id: String,
        attempt: u32,
        wait_ms: u64,
    },
    /// The observability configuration was changed at runtime.
    ConfigurationChange {
        timestamp: DateTime<Utc>,
        changed: Vec<String>,
    },
    /// An application-defined event (e.g. analytics batches).
    Custom {
        timestamp: DateTime<Utc>,
        name: String,
        payload: serde_json::Value,
    },
}

impl SdkEvent {
    pub fn request_start(method: &str, path: &str, version: &str, operation_id: &str) -> Self {
        Self::RequestStart {
            timestamp: Utc::now(),
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            operation_id: operation_id.to_string(),
        }
    }

    pub fn request_end(
        method: &str,
        path: &str,
        version: &str,
        operation_id: &str,
        status: u16,
        duration: Duration,
    ) -> Self {
        Self::RequestEnd {
            timestamp: Utc::now(),
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            operation_id: operation_id.to_string(),
            status,
            duration_ms: duration.as_millis() as u64,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn request_error(
        method: &str,
        path: &str,
        version: &str,
        operation_id: &str,
        status: Option<u16>,
        code: &str,
        message: &str,
        duration: Duration,
    ) -> Self {
        Self::RequestError {
            timestamp: Utc::now(),
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            operation_id: operation_id.to_string(),
            status,
            code: code.to_string(),
            message: message.to_string(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn subscription_start(channel: &str) -> Self {
        Self::SubscriptionStart {
            timestamp: Utc::now(),
            channel: channel.to_string(),
        }
    }

    pub fn subscription_end(channel: &str) -> Self {
        Self::SubscriptionEnd {
            timestamp: Utc::now(),
            channel: channel.to_string(),
        }
    }

    pub fn subscription_error(channel: &str, message: &str) -> Self {
        Self::SubscriptionError {
            timestamp: Utc::now(),
            channel: channel.to_string(),
            message: message.to_string(),
        }
    }

    pub fn rate_limit_hit(operation_id: &str, attempt: u32, wait: Duration) -> Self {
        Self::RateLimitHit {
            timestamp: Utc::now(),
            operation_id: operation_id.to_string(),
            attempt,
            wait_ms: wait.as_millis() as u64,
        }
    }

    pub fn configuration_change(changed: Vec<String>) -> Self {
        Self::ConfigurationChange {
            timestamp: Utc::now(),
            changed,
        }
    }

    pub fn custom(name: &str, payload: serde_json::Value) -> Self {
        Self::Custom {
            timestamp: Utc::now(),
            name: name.to_string(),
            payload,
        }
    }

    /// The wire-level event tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RequestStart { .. } => "request-start",
            Self::RequestEnd { .. } => "request-end",
            Self::RequestError { .. } => "request-error",
            Self::SubscriptionStart { .. } => "subscription-start",
            Self::SubscriptionEnd { .. } => "subscription-end",
            Self::SubscriptionError { .. } => "subscription-error",
            Self::RateLimitHit { .. } => "rate-limit-hit",
            Self::ConfigurationChange { .. } => "configuration-change",
            Self::Custom { .. } => "custom",
        }
    }

    /// The log level this event is mirrored at when logging is enabled.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::RequestError { .. } | Self::SubscriptionError { .. } | Self::RateLimitHit { .. } => {
                LogLevel::Warn
            }
            Self::ConfigurationChange { .. } => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    /// One-line rendering used when mirroring the event into logs.
    pub fn summary(&self) -> String {
        match self {
            Self::RequestStart {
                method,
                path,
                version,
                operation_id,
                ..
            } => format!("request-start {method} {path} ({version}) op={operation_id}"),
            Self::RequestEnd {
                method,
                path,
                status,
                duration_ms,
                operation_id,
                ..
            } => format!(
                "request-end {method} {path} status={status} duration_ms={duration_ms} op={operation_id}"
            ),
            Self::RequestError {
                method,
                path,
                status,
                code,
                message,
                operation_id,
                ..
            } => {
                let status = status.map_or_else(|| "none".to_string(), |s| s.to_string());
                format!(
                    "request-error {method} {path} status={status} code={code} op={operation_id}: {message}"
                )
            }
            Self::SubscriptionStart { channel, .. } => format!("subscription-start {channel}"),
            Self::SubscriptionEnd { channel, .. } => format!("subscription-end {channel}"),
            Self::SubscriptionError {
                channel, message, ..
            } => format!("subscription-error {channel}: {message}"),
            Self::RateLimitHit {
                operation_id,
                attempt,
                wait_ms,
                ..
            } => format!("rate-limit-hit op={operation_id} attempt={attempt} wait_ms={wait_ms}"),
            Self::ConfigurationChange { changed, .. } => {
                format!("configuration-change [{}]", changed.join(", "))
            }
            Self::Custom { name, .. } => format!("custom {name}"),
        }
    }
}
