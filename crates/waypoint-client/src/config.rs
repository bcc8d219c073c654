//! Construction-time configuration for the client.

use crate::error::{ApiError, ApiResult};
use crate::retry::RateLimitPolicy;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default backend API URL (can be overridden at compile time via the
/// WAYPOINT_API_URL env var).
pub const DEFAULT_API_URL: &str = match option_env!("WAYPOINT_API_URL") {
    Some(url) => url,
    None => "https://api.waypoint.app",
};

/// Default realtime credential endpoint (compile-time override via
/// WAYPOINT_REALTIME_URL).
pub const DEFAULT_REALTIME_URL: &str = match option_env!("WAYPOINT_REALTIME_URL") {
    Some(url) => url,
    None => "https://realtime.waypoint.app",
};

/// Earliest supported API version; the default for new clients.
pub const DEFAULT_API_VERSION: &str = "v1";

/// Client construction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend API endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Realtime credential endpoint.
    #[serde(default = "default_realtime_url")]
    pub realtime_url: String,
    /// Pre-shared realtime key, when the realtime service requires one.
    #[serde(default)]
    pub realtime_key: Option<String>,
    /// API version tag; defaults to the earliest supported version.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Pre-obtained auth token; settable after construction too.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Retry policy for rate-limited requests.
    #[serde(default)]
    pub rate_limit: RateLimitPolicy,
    /// Module allow-list; `None` loads every registered module.
    #[serde(default)]
    pub modules: Option<Vec<String>>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_realtime_url() -> String {
    DEFAULT_REALTIME_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            realtime_url: default_realtime_url(),
            realtime_key: None,
            api_version: default_api_version(),
            auth_token: None,
            rate_limit: RateLimitPolicy::default(),
            modules: None,
        }
    }
}

impl ClientConfig {
    /// Defaults, then runtime environment overrides.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Override configuration from environment variables. Only the
    /// endpoint and version are runtime-overridable; credentials are not.
    fn load_from_env(&mut self) {
        if let Ok(api_url) = std::env::var("WAYPOINT_API_URL") {
            self.api_url = api_url;
        }
        if let Ok(api_version) = std::env::var("WAYPOINT_API_VERSION") {
            self.api_version = api_version;
        }
    }

    /// Validate the endpoints parse as URLs.
    pub fn validate(&self) -> ApiResult<()> {
        Url::parse(&self.api_url)
            .map_err(|error| ApiError::configuration(format!("invalid api_url: {error}")))?;
        Url::parse(&self.realtime_url)
            .map_err(|error| ApiError::configuration(format!("invalid realtime_url: {error}")))?;
        Ok(())
    }
}
