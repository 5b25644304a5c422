//! Request execution.
//!
//! [`RequestExecutor`] is the single seam between the stateful objects and
//! the network. It never fails: whatever happens, the caller gets an
//! [`HttpResponse`] back. [`HttpExecutor`] is the reqwest implementation.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::response::HttpResponse;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// One API call, described independently of any HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Relative API path (`users/alice`), host-relative path (`/v0/users?..`)
    /// or absolute URL. Cursors are passed through untouched.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::HEAD, path)
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn query_pairs<'a>(mut self, pairs: impl IntoIterator<Item = (&'a str, String)>) -> Self {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.to_string(), v)));
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a header if one is given; used with conditional-write headers.
    #[must_use]
    pub fn maybe_header(self, header: Option<(&str, String)>) -> Self {
        match header {
            Some((name, value)) => self.header(name, value),
            None => self,
        }
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Looks up a header added to this request (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Joins path segments, percent-encoding each one.
pub fn api_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| urlencoding::encode(s.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Performs API calls.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Executes one request. Transport problems are folded into the
    /// returned response rather than reported as errors.
    async fn execute(&self, request: ApiRequest) -> HttpResponse;
}

/// An executor shared by every object created from the same client.
pub type SharedExecutor = Arc<dyn RequestExecutor>;

/// The executor an entity or list issues its requests through.
#[derive(Clone, Default)]
pub(crate) struct Binding(Option<SharedExecutor>);

impl Binding {
    pub(crate) fn set(&mut self, executor: SharedExecutor) {
        self.0 = Some(executor);
    }

    pub(crate) fn get(&self) -> Option<&SharedExecutor> {
        self.0.as_ref()
    }

    pub(crate) fn require(&self) -> ClientResult<SharedExecutor> {
        self.0.clone().ok_or(ClientError::NoExecutor)
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_bound() { "Bound" } else { "Unbound" })
    }
}

/// reqwest-backed executor.
pub struct HttpExecutor {
    config: ClientConfig,
    client: Client,
}

impl HttpExecutor {
    /// Creates an executor for the given configuration.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { config, client })
    }

    /// Wraps the executor for sharing.
    pub fn shared(self) -> SharedExecutor {
        Arc::new(self)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolves a request path against the configured host.
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.config.host_url(), path)
        } else {
            format!("{}/{}", self.config.base_url(), path)
        }
    }

    async fn read_response(response: reqwest::Response) -> HttpResponse {
        let status = response.status();
        let url = response.url().to_string();

        let mut normalized = HttpResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
        )
        .with_url(url.clone());

        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                normalized = normalized.with_header(name.as_str(), value);
            }
        }

        match response.text().await {
            Ok(text) if text.trim().is_empty() => normalized,
            Ok(text) => {
                let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
                normalized.with_body(body)
            }
            Err(e) => {
                warn!("Failed to read response body from {}: {}", url, e);
                HttpResponse::unexpected_failure(format!("failed to read body: {e}"), Some(url))
            }
        }
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, request: ApiRequest) -> HttpResponse {
        let url = self.resolve_url(&request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .basic_auth(&self.config.api_key, None::<&str>);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        match builder.send().await {
            Ok(response) => {
                let response = Self::read_response(response).await;
                debug!("{} {} -> {}", request.method, url, response.status());
                response
            }
            Err(e) if e.is_connect() => {
                warn!("Connection to {} failed: {}", url, e);
                HttpResponse::transport_failure(e.to_string(), Some(url))
            }
            Err(e) => {
                warn!("Request to {} failed: {}", url, e);
                let reason = if e.is_timeout() {
                    format!("request timed out: {e}")
                } else {
                    e.to_string()
                };
                HttpResponse::unexpected_failure(reason, Some(url))
            }
        }
    }
}
