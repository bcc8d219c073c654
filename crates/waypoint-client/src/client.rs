//! The request pipeline: version resolution, auth injection, rate-limited
//! retry, response classification, and event emission composed into one
//! operation.
//!
//! One [`ApiClient`] is constructed per application and lives for the
//! application's lifetime. All reads and writes go through
//! [`ApiClient::request`]; only live-update subscriptions use the
//! [`RealtimeHandle`] obtained from [`ApiClient::realtime`].

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::module::{Module, ModuleContext, ModuleRegistry};
use crate::realtime::{RealtimeCredentials, RealtimeHandle};
use crate::retry::{self, RateLimitPolicy};
use crate::transport::{HttpMethod, HttpTransport, ReqwestTransport, TransportRequest};
use crate::version;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use uuid::Uuid;
use waypoint_observability::{ObservabilityContext, SdkEvent};

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// The client-side request runtime.
///
/// Owns the current auth token and API version (both mutable after
/// construction), the rate-limit policy, the loaded module instances
/// (built exactly once at construction), and the realtime capability
/// handle. Token and version are read at the moment a call begins; a
/// concurrent setter affects only subsequently-started requests.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    auth_token: RwLock<Option<String>>,
    api_version: RwLock<String>,
    rate_limit: RateLimitPolicy,
    observability: Arc<ObservabilityContext>,
    realtime: RealtimeHandle,
    modules: HashMap<String, Arc<dyn Module>>,
}

impl ApiClient {
    /// Construct a client over the production HTTP transport.
    ///
    /// Every descriptor in `registry` (filtered by the config allow-list)
    /// has its factory invoked exactly once. Factories receive a
    /// [`ModuleContext`] they may hold, but must not issue requests from
    /// inside the factory itself; the client is not live until
    /// construction returns.
    pub fn new(
        config: ClientConfig,
        registry: &ModuleRegistry,
        observability: Arc<ObservabilityContext>,
    ) -> ApiResult<Arc<Self>> {
        Self::with_transport(config, registry, observability, Arc::new(ReqwestTransport::new()))
    }

    /// Construct a client over a caller-supplied transport.
    pub fn with_transport(
        config: ClientConfig,
        registry: &ModuleRegistry,
        observability: Arc<ObservabilityContext>,
        transport: Arc<dyn HttpTransport>,
    ) -> ApiResult<Arc<Self>> {
        config.validate()?;

        let realtime = RealtimeHandle::new(
            RealtimeCredentials {
                endpoint: config.realtime_url.clone(),
                key: config.realtime_key.clone(),
            },
            observability.clone(),
        );
        let allow = config.modules.clone();

        let client = Arc::new_cyclic(|weak: &Weak<ApiClient>| {
            let context = ModuleContext::new(weak.clone());
            let modules = registry.load_all(allow.as_deref(), &context);
            ApiClient {
                transport,
                api_url: config.api_url,
                auth_token: RwLock::new(config.auth_token),
                api_version: RwLock::new(config.api_version),
                rate_limit: config.rate_limit,
                observability,
                realtime,
                modules,
            }
        });

        tracing::info!(
            modules = client.modules.len(),
            version = %client.api_version(),
            "api client constructed"
        );
        Ok(client)
    }

    /// Perform a versioned API call and parse the response body as `T`.
    ///
    /// Emits exactly one request-start event per call and exactly one of
    /// request-end/request-error per physical attempt; rate-limited
    /// attempts are retried under the configured policy, each emitting its
    /// own error event before the controller backs off.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ApiResult<T> {
        let version = self.api_version.read().clone();
        let token = self.auth_token.read().clone();
        let wire_path = version::resolve(path, &version);
        let url = format!("{}{}", self.api_url.trim_end_matches('/'), wire_path);
        let operation_id = Uuid::new_v4().to_string();

        self.observability.emit(SdkEvent::request_start(
            method.as_str(),
            path,
            &version,
            &operation_id,
        ));

        let body_text = match &body {
            Some(value) if method != HttpMethod::Get => match serde_json::to_string(value) {
                Ok(text) => Some(text),
                Err(error) => {
                    let error = ApiError::serialization("request body", error.to_string());
                    self.emit_request_error(method, path, &version, &operation_id, &error, Duration::ZERO);
                    return Err(error);
                }
            },
            _ => None,
        };

        let outcome = retry::with_retry(
            &self.rate_limit,
            self.observability.as_ref(),
            &operation_id,
            || {
                self.attempt::<T>(
                    method,
                    &url,
                    path,
                    &version,
                    &operation_id,
                    token.as_deref(),
                    body_text.as_deref(),
                )
            },
        )
        .await?;

        if let Some(info) = outcome.rate_limit {
            tracing::debug!(
                operation_id = %operation_id,
                remaining = ?info.remaining,
                limit = ?info.limit,
                reset = ?info.reset,
                "rate limit headroom"
            );
        }

        Ok(outcome.value)
    }

    /// One physical HTTP attempt: build headers, execute, classify.
    #[allow(clippy::too_many_arguments)]
    async fn attempt<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        url: &str,
        path: &str,
        version: &str,
        operation_id: &str,
        token: Option<&str>,
        body: Option<&str>,
    ) -> ApiResult<T> {
        let started = Instant::now();

        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-API-Version".to_string(), version.to_string()),
            ("X-SDK-Operation-ID".to_string(), operation_id.to_string()),
        ];
        if let Some(token) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let request = TransportRequest {
            method,
            url: url.to_string(),
            headers,
            body: body.map(str::to_string),
        };

        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(failure) => {
                let error: ApiError = failure.into();
                self.emit_request_error(method, path, version, operation_id, &error, started.elapsed());
                tracing::warn!(
                    operation_id,
                    code = error.code.as_str(),
                    "transport failure"
                );
                return Err(error);
            }
        };

        if !response.is_success() {
            let error = ApiError::from_response(response.status, &response.headers, &response.body);
            self.emit_request_error(method, path, version, operation_id, &error, started.elapsed());
            tracing::warn!(
                operation_id,
                status = response.status,
                code = error.code.as_str(),
                body_summary = %summarize_response_body(&response.body),
                "request failed"
            );
            return Err(error);
        }

        match serde_json::from_str::<T>(&response.body) {
            Ok(parsed) => {
                self.observability.emit(SdkEvent::request_end(
                    method.as_str(),
                    path,
                    version,
                    operation_id,
                    response.status,
                    started.elapsed(),
                ));
                Ok(parsed)
            }
            Err(parse_error) => {
                let error = ApiError::serialization("response body", parse_error.to_string());
                self.emit_request_error(method, path, version, operation_id, &error, started.elapsed());
                tracing::warn!(
                    operation_id,
                    status = response.status,
                    body_summary = %summarize_response_body(&response.body),
                    "response body failed to parse"
                );
                Err(error)
            }
        }
    }

    fn emit_request_error(
        &self,
        method: HttpMethod,
        path: &str,
        version: &str,
        operation_id: &str,
        error: &ApiError,
        elapsed: Duration,
    ) {
        self.observability.emit(SdkEvent::request_error(
            method.as_str(),
            path,
            version,
            operation_id,
            error.http_status,
            error.code.as_str(),
            &error.message,
            elapsed,
        ));
    }

    /// Replace the auth token used by subsequently-started requests.
    /// The token value itself is never logged.
    pub fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write() = token;
        tracing::debug!("auth token updated");
    }

    /// The currently-set auth token.
    pub fn auth_token(&self) -> Option<String> {
        self.auth_token.read().clone()
    }

    /// The API version tag used by subsequently-started requests.
    pub fn api_version(&self) -> String {
        self.api_version.read().clone()
    }

    /// Change the API version tag.
    pub fn set_api_version(&self, version: impl Into<String>) {
        let version = version.into();
        let mut guard = self.api_version.write();
        tracing::info!(old = %*guard, new = %version, "api version changed");
        *guard = version;
    }

    /// Look up a previously-loaded module instance. A pure lookup: all
    /// modules are built exactly once at client construction.
    pub fn module(&self, name: &str) -> ApiResult<Arc<dyn Module>> {
        self.modules.get(name).cloned().ok_or_else(|| {
            let mut available: Vec<String> = self.modules.keys().cloned().collect();
            available.sort();
            ApiError::module_not_found(name, available)
        })
    }

    /// Names of the loaded modules, sorted.
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    /// The live-update subscription capability. Reads and writes must not
    /// go through this handle; use [`ApiClient::request`].
    pub fn realtime(&self) -> RealtimeHandle {
        self.realtime.clone()
    }

    /// The observability context events are reported through.
    pub fn observability(&self) -> &Arc<ObservabilityContext> {
        &self.observability
    }
}
