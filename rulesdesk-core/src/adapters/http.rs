//! HTTP transport shared by the rules and auth clients
//!
//! Attaches the bearer token, maps failures to [`ApiError`], unwraps the
//! `{ success, data, ... }` envelope, and reports every failure to the
//! notification sink by category. A 401 clears the shared token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use url::Url;

use crate::domain::result::Result as ApiResult;
use crate::domain::{ApiError, ApiResponse};
use crate::ports::NotificationSink;

/// Default rules management service URL
pub const DEFAULT_BASE_URL: &str = "https://rules-management.local.dev";

/// Default versioned API prefix
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Bearer token shared between the transport and the session store
#[derive(Debug, Clone, Default)]
pub struct TokenHandle(Arc<RwLock<Option<String>>>);

impl TokenHandle {
    pub fn new(token: Option<String>) -> Self {
        Self(Arc::new(RwLock::new(token.filter(|t| !t.is_empty()))))
    }

    pub fn get(&self) -> Option<String> {
        self.0.read().clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.0.write() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.0.write() = None;
    }

    pub fn is_set(&self) -> bool {
        self.0.read().is_some()
    }
}

/// Configured HTTP transport
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
    token: TokenHandle,
    notifications: Option<Arc<dyn NotificationSink>>,
}

impl HttpTransport {
    /// Create a transport for `base_url` + `prefix`
    pub fn new(base_url: &str, prefix: &str, timeout: Duration, token: TokenHandle) -> Result<Self> {
        let base = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            prefix.trim_matches('/')
        );
        let base = base.trim_end_matches('/').to_string();
        Url::parse(&base).with_context(|| format!("Invalid API base URL: {}", base))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base,
            timeout,
            token,
            notifications: None,
        })
    }

    /// Report failures to a notification sink
    pub fn with_notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = Some(sink);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &TokenHandle {
        &self.token
    }

    /// Absolute URL for an API path with optional query pairs
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Url> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw)
            .map_err(|e| ApiError::precondition(format!("Invalid request URL {}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Absolute URL from path segments, each percent-encoded on its own
    ///
    /// Use for paths that carry ids, so a `/`, `?` or `#` inside an id
    /// stays in its segment.
    pub fn segments_url(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.url("", &[])?;
        url.path_segments_mut()
            .map_err(|_| ApiError::precondition(format!("Invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request, attaching the bearer token when one is set
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and decode the envelope
    pub async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<ApiResponse<T>> {
        let response = self.dispatch(builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.fail(self.map_request_error(e)))?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes).map_err(|e| {
            self.fail(ApiError::Decode(format!("Failed to parse API response: {}", e)))
        })?;
        envelope.ensure_success().map_err(|e| self.fail(e))
    }

    /// Send and return `data`, which must be present
    pub async fn send_data<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        self.send(builder).await?.into_data()
    }

    /// Send where no body is expected; an envelope, if any, must report success
    pub async fn send_empty(&self, builder: RequestBuilder) -> ApiResult<()> {
        let response = self.dispatch(builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.fail(self.map_request_error(e)))?;
        if let Ok(envelope) = serde_json::from_slice::<ApiResponse<JsonValue>>(&bytes) {
            envelope.ensure_success().map_err(|e| self.fail(e))?;
        }
        Ok(())
    }

    /// Send and return the raw body (file downloads)
    pub async fn send_bytes(&self, builder: RequestBuilder) -> ApiResult<Vec<u8>> {
        let response = self.dispatch(builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.fail(self.map_request_error(e)))?;
        Ok(bytes.to_vec())
    }

    /// Execute the request and reject non-success statuses
    async fn dispatch(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let started = Instant::now();
        let request = builder
            .build()
            .map_err(|e| self.fail(ApiError::precondition(e.to_string())))?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| self.fail(self.map_request_error(e)))?;

        let status = response.status();
        debug!(
            %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "API request completed"
        );

        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let server_message = serde_json::from_slice::<JsonValue>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));

        if status.as_u16() == 401 {
            warn!(path = %path, "Unauthorized response, clearing session token");
            self.token.clear();
        }

        Err(self.fail(ApiError::http(status.as_u16(), server_message)))
    }

    /// Forward a failure to the notification sink and hand it back
    fn fail(&self, error: ApiError) -> ApiError {
        if let Some(sink) = &self.notifications {
            sink.show_api_error(&error);
        }
        error
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::network(format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            ApiError::network("Unable to connect to the rules management service")
        } else if error.is_decode() {
            ApiError::Decode(format!("Failed to read API response: {}", error))
        } else {
            ApiError::network(format!("Request failed: {}", error))
        }
    }
}
