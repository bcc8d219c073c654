//! Module registry, loader, and base contract.
//!
//! Feature modules (profile sync, chat, analytics, …) are registered by
//! name into an explicit [`ModuleRegistry`] instance and constructed
//! exactly once per client. The registry is an ordered list passed into
//! client construction, and the loader is a pure fold over it, so there
//! is no import-order dependency and no process-wide mutable state.

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::realtime::RealtimeHandle;
use crate::transport::HttpMethod;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// A feature module built on the request pipeline.
pub trait Module: Send + Sync + std::fmt::Debug {
    /// The unique registry name this module was loaded under.
    fn name(&self) -> &str;

    /// Downcast support for typed retrieval by callers.
    fn as_any(&self) -> &dyn Any;
}

/// Factory invoked once per client construction.
pub type ModuleFactory = Arc<dyn Fn(ModuleContext) -> Arc<dyn Module> + Send + Sync>;

/// (name, factory) pair; names are unique within a registry.
#[derive(Clone)]
pub struct ModuleDescriptor {
    name: String,
    factory: ModuleFactory,
}

impl ModuleDescriptor {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(ModuleContext) -> Arc<dyn Module> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered collection of module descriptors.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    descriptors: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor. Registering a name twice is a hard failure,
    /// never a silent overwrite.
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> ApiResult<()> {
        if self
            .descriptors
            .iter()
            .any(|existing| existing.name == descriptor.name)
        {
            return Err(ApiError::configuration(format!(
                "module '{}' is already registered",
                descriptor.name
            )));
        }
        tracing::debug!(module = %descriptor.name, "module registered");
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.descriptors
            .iter()
            .map(|descriptor| descriptor.name.clone())
            .collect()
    }

    /// Invoke every (allow-listed) factory exactly once against `context`,
    /// producing the live module map. Repeated construction of a second
    /// client re-runs the factories, yielding independent instances.
    pub(crate) fn load_all(
        &self,
        allow: Option<&[String]>,
        context: &ModuleContext,
    ) -> HashMap<String, Arc<dyn Module>> {
        self.descriptors
            .iter()
            .filter(|descriptor| {
                allow.is_none_or(|names| names.iter().any(|name| name == &descriptor.name))
            })
            .map(|descriptor| {
                let instance = (descriptor.factory)(context.clone());
                (descriptor.name.clone(), instance)
            })
            .collect()
    }
}

/// The capability surface every module is built against.
///
/// Holds a non-owning back-reference to the client. Two capabilities are
/// exposed: issuing a pipeline request, and obtaining the live-update
/// subscription handle. Ordinary reads and all writes must go through
/// [`ModuleContext::request`]; [`ModuleContext::realtime`] is reserved
/// for live-update registration. That routing rule is the one invariant
/// governing every module built on this runtime.
#[derive(Clone)]
pub struct ModuleContext {
    client: Weak<ApiClient>,
}

impl ModuleContext {
    pub(crate) fn new(client: Weak<ApiClient>) -> Self {
        Self { client }
    }

    fn client(&self) -> ApiResult<Arc<ApiClient>> {
        self.client
            .upgrade()
            .ok_or_else(|| ApiError::configuration("client has been dropped"))
    }

    /// Issue a versioned, authenticated pipeline request.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ApiResult<T> {
        self.client()?.request(method, path, body).await
    }

    /// The live-update subscription capability.
    pub fn realtime(&self) -> ApiResult<RealtimeHandle> {
        Ok(self.client()?.realtime())
    }

    /// The API version the owning client currently targets.
    pub fn api_version(&self) -> ApiResult<String> {
        Ok(self.client()?.api_version())
    }
}
