//! Error types for the client layer.
//!
//! Only local, programming-class failures are errors. A request that reached
//! the server (or failed to) always produces an [`crate::HttpResponse`] and a
//! `false` outcome instead.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised before a request is sent, or while settling one.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A property the request needs (collection, key, ref, ...) is not set.
    #[error("missing required property: {0}")]
    MissingProperty(&'static str),

    /// No request executor has been bound to the object.
    #[error("no request executor bound")]
    NoExecutor,

    /// The conditional-write policy is not valid for this operation.
    #[error("invalid conditional write: {0}")]
    InvalidConditional(String),

    /// A payload handed to `init` could not be interpreted.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A deferred request is still outstanding.
    #[error("a deferred request is still pending")]
    Pending,

    /// A deferred request task did not complete.
    #[error("deferred request failed: {0}")]
    Deferred(String),

    /// A JMESPath expression did not compile or could not be evaluated.
    #[error("invalid query expression: {0}")]
    Query(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<orchestrate_types::Error> for ClientError {
    fn from(err: orchestrate_types::Error) -> Self {
        use orchestrate_types::Error;
        match err {
            Error::MissingRef => ClientError::MissingProperty("ref"),
            Error::Serialization(e) => ClientError::Serialization(e),
            Error::InvalidLocation(msg) | Error::InvalidPayload(msg) => {
                ClientError::InvalidPayload(msg)
            }
        }
    }
}
