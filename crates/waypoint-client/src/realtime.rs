//! Opaque capability handle for live-update subscriptions.
//!
//! The runtime does not implement the live-update transport; it exposes
//! this handle so modules can register subscriptions against it. The
//! routing invariant: ordinary reads and all writes go through
//! [`crate::client::ApiClient::request`]; this handle is reserved for
//! subscription use only. That convention is upheld by module authors,
//! not enforced by the type system.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waypoint_observability::{ObservabilityContext, SdkEvent};

/// Connection descriptor for the live-update channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeCredentials {
    /// Endpoint of the realtime credential/token service.
    pub endpoint: String,
    /// Pre-shared key used by the realtime service, when required.
    pub key: Option<String>,
}

/// Cloneable handle to the underlying realtime connection descriptor.
#[derive(Clone)]
pub struct RealtimeHandle {
    credentials: Arc<RealtimeCredentials>,
    observability: Arc<ObservabilityContext>,
}

impl std::fmt::Debug for RealtimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeHandle")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl RealtimeHandle {
    pub(crate) fn new(
        credentials: RealtimeCredentials,
        observability: Arc<ObservabilityContext>,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            observability,
        }
    }

    /// The connection descriptor the subscription transport is built from.
    pub fn credentials(&self) -> &RealtimeCredentials {
        &self.credentials
    }

    /// Report a subscription registration.
    pub fn subscription_started(&self, channel: &str) {
        self.observability.emit(SdkEvent::subscription_start(channel));
    }

    /// Report a subscription teardown.
    pub fn subscription_ended(&self, channel: &str) {
        self.observability.emit(SdkEvent::subscription_end(channel));
    }

    /// Report a subscription failure.
    pub fn subscription_failed(&self, channel: &str, message: &str) {
        self.observability
            .emit(SdkEvent::subscription_error(channel, message));
    }
}
