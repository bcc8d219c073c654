//! # Waypoint Client Runtime
//!
//! The client-side request runtime the Waypoint frontend is built on. It
//! dispatches authenticated, versioned operations to the Waypoint backend,
//! retries rate-limited requests with bounded exponential backoff,
//! classifies failures into a closed typed taxonomy, and reports lifecycle
//! progress through an injected observability context.
//!
//! ## Overview
//!
//! The crate provides:
//!
//! - **[`ApiClient`]**: the request pipeline. Version resolution, auth
//!   header injection, retry, response/error classification, and event
//!   emission composed into one `request` operation.
//!
//! - **[`ModuleRegistry`]** / **[`ModuleContext`]**: the extensibility
//!   contract. Feature modules register a named factory; every factory is
//!   invoked exactly once at client construction.
//!
//! ## Routing rule
//!
//! All ordinary reads and writes go through the pipeline. Only live-update
//! subscriptions use the [`RealtimeHandle`]; the subscription transport
//! itself lives outside this crate.
//!
//! ## Example
//!
//! ```ignore
//! use waypoint_client::{ApiClient, ClientConfig, HttpMethod, ModuleRegistry};
//! use waypoint_observability::{ObservabilityConfig, ObservabilityContext};
//!
//! let observability = Arc::new(ObservabilityContext::new(
//!     ObservabilityConfig::for_environment("development"),
//! ));
//! let mut registry = ModuleRegistry::new();
//! registry.register(profile_sync_descriptor())?;
//!
//! let client = ApiClient::new(ClientConfig::new(), &registry, observability)?;
//! client.set_auth_token(Some(session_token));
//!
//! let item: Item = client.request(HttpMethod::Get, "/items/42", None).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod module;
pub mod realtime;
pub mod retry;
pub mod transport;
pub mod version;

#[cfg(test)]
mod tests;

pub use client::ApiClient;
pub use config::{ClientConfig, DEFAULT_API_URL, DEFAULT_API_VERSION, DEFAULT_REALTIME_URL};
pub use error::{ApiError, ApiResult, ErrorCode, ErrorDetails, RateLimitInfo};
pub use module::{Module, ModuleContext, ModuleDescriptor, ModuleFactory, ModuleRegistry};
pub use realtime::{RealtimeCredentials, RealtimeHandle};
pub use retry::{RateLimitPolicy, RetryOutcome};
pub use transport::{
    HttpMethod, HttpTransport, ReqwestTransport, TransportFailure, TransportRequest,
    TransportResponse,
};
