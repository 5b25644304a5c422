//! Normalized HTTP responses.
//!
//! Every request yields one of these, including requests that never reached
//! the server: a connection failure is status `0` and any other transport
//! failure a synthetic `500`, both carrying the error text as the reason.

use orchestrate_types::ref_from_etag;
use serde_json::Value;
use std::collections::HashMap;

/// Status used when the server could not be reached at all.
pub const STATUS_TRANSPORT_FAILURE: u16 = 0;

/// Status synthesized for unexpected client-side failures (e.g. timeouts).
pub const STATUS_UNEXPECTED_FAILURE: u16 = 500;

/// Header carrying the server's request id.
pub const REQUEST_ID_HEADER: &str = "x-orchestrate-req-id";

/// A response-shaped outcome of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    status: u16,
    reason: String,
    /// Header names are stored lowercase.
    headers: HashMap<String, String>,
    body: Option<Value>,
    url: Option<String>,
}

impl HttpResponse {
    /// Creates a response with the given status and reason phrase.
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            ..Default::default()
        }
    }

    /// A connection-level failure; the request never reached the server.
    pub fn transport_failure(message: impl Into<String>, url: Option<String>) -> Self {
        Self {
            status: STATUS_TRANSPORT_FAILURE,
            reason: message.into(),
            url,
            ..Default::default()
        }
    }

    /// Any other failure that left no server response behind.
    pub fn unexpected_failure(message: impl Into<String>, url: Option<String>) -> Self {
        Self {
            status: STATUS_UNEXPECTED_FAILURE,
            reason: message.into(),
            url,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True if the request never produced a server response.
    pub fn is_transport_failure(&self) -> bool {
        self.status == STATUS_TRANSPORT_FAILURE
    }

    /// True for `409 Conflict` and `412 Precondition Failed`.
    pub fn is_precondition_failure(&self) -> bool {
        matches!(self.status, 409 | 412)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// The effective request URL, when known.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The version ref carried in the `ETag` header.
    pub fn etag_ref(&self) -> Option<String> {
        self.header("etag").and_then(ref_from_etag)
    }

    /// `Location`, falling back to `Content-Location`.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
            .or_else(|| self.header("content-location"))
    }

    /// The server's request id, useful when reporting problems.
    pub fn request_id(&self) -> Option<&str> {
        self.header(REQUEST_ID_HEADER)
    }

    /// Error code from an error body (e.g. `items_not_found`).
    pub fn error_code(&self) -> Option<&str> {
        self.body_str("code")
    }

    /// Error message from an error body, or the reason phrase.
    pub fn error_message(&self) -> Option<&str> {
        if self.is_success() {
            return None;
        }
        self.body_str("message")
            .or(Some(self.reason.as_str()).filter(|r| !r.is_empty()))
    }

    fn body_str(&self, field: &str) -> Option<&str> {
        self.body.as_ref()?.get(field)?.as_str()
    }
}
