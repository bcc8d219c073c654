//! HTTP transport seam for the request pipeline.
//!
//! The pipeline talks to [`HttpTransport`] rather than to `reqwest`
//! directly, so tests can script responses without a network. Production
//! traffic goes through [`ReqwestTransport`].

use crate::error::ApiError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// HTTP methods the pipeline dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-built outgoing request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransportRequest {
    /// Case-insensitive header lookup, for tests and logging.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A raw response with lowercased header names.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure before any HTTP response arrived.
#[derive(Debug, Clone, Error)]
pub enum TransportFailure {
    /// The transport-level deadline elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Connection establishment failed (DNS, TCP, TLS).
    #[error("connection failed: {0}")]
    Connect(String),
    /// Any other transport-level failure.
    #[error("transport error: {0}")]
    Other(String),
}

impl From<TransportFailure> for ApiError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Timeout(message) => ApiError::timeout(message),
            TransportFailure::Connect(message) | TransportFailure::Other(message) => {
                ApiError::network(message)
            }
        }
    }
}

/// The one seam between the pipeline and the wire.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure>;
}

/// Production transport over a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|error| TransportFailure::Other(error.to_string()))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> TransportFailure {
    if error.is_timeout() {
        TransportFailure::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportFailure::Connect(error.to_string())
    } else {
        TransportFailure::Other(error.to_string())
    }
}
