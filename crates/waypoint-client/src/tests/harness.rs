//! Test harness for pipeline integration tests.
//!
//! Provides:
//! - ScriptedTransport: an HttpTransport that replays queued responses and
//!   records every request it sees
//! - CollectingSink: a TelemetrySink that captures emitted events

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::module::ModuleRegistry;
use crate::retry::RateLimitPolicy;
use crate::transport::{HttpTransport, TransportFailure, TransportRequest, TransportResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use waypoint_observability::{
    ObservabilityConfig, ObservabilityContext, SdkEvent, SinkError, TelemetrySink,
};

/// One scripted transport outcome.
pub enum ScriptedResult {
    Response(TransportResponse),
    Failure(TransportFailure),
}

/// An HttpTransport that pops queued results and records requests.
#[derive(Default)]
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<ScriptedResult>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response for the next request.
    pub fn queue_response(&self, status: u16, headers: &[(&str, &str)], body: &str) {
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), value.to_string()))
            .collect();
        self.queue
            .lock()
            .push_back(ScriptedResult::Response(TransportResponse {
                status,
                headers,
                body: body.to_string(),
            }));
    }

    /// Queue a transport failure for the next request.
    pub fn queue_failure(&self, failure: TransportFailure) {
        self.queue.lock().push_back(ScriptedResult::Failure(failure));
    }

    /// Every request executed so far.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportFailure> {
        self.requests.lock().push(request);
        match self.queue.lock().pop_front() {
            Some(ScriptedResult::Response(response)) => Ok(response),
            Some(ScriptedResult::Failure(failure)) => Err(failure),
            None => Err(TransportFailure::Other("script exhausted".to_string())),
        }
    }
}

/// A telemetry sink that captures every event it receives.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SdkEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<SdkEvent> {
        self.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.event_type()).collect()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }
}

impl TelemetrySink for CollectingSink {
    fn send(&self, event: &SdkEvent) -> Result<(), SinkError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// A config pointing at a scripted backend with millisecond backoff.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        api_url: "http://api.test".to_string(),
        realtime_url: "http://realtime.test".to_string(),
        rate_limit: RateLimitPolicy {
            retry_enabled: true,
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            jitter: 0.0,
        },
        ..Default::default()
    }
}

/// Build a client over `transport` with a collecting telemetry sink.
pub fn build_client(
    config: ClientConfig,
    registry: &ModuleRegistry,
    transport: Arc<ScriptedTransport>,
) -> (Arc<ApiClient>, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::default());
    let observability = Arc::new(ObservabilityContext::new(ObservabilityConfig {
        telemetry_enabled: true,
        telemetry_sink: Some(sink.clone()),
        ..Default::default()
    }));
    let client = ApiClient::with_transport(config, registry, observability, transport)
        .expect("client construction");
    (client, sink)
}
