//! Client configuration.
//!
//! The configuration is plain data. Reading credentials from the process
//! environment (or anywhere else) is left to the application.

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Connection settings for the Orchestrate API.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API key, sent as the basic-auth user name.
    pub api_key: String,
    /// API host (e.g. `https://api.orchestrate.io`).
    pub host: String,
    /// API version path segment (e.g. `v0`).
    pub api_version: String,
    /// Total request timeout, in seconds.
    pub timeout_secs: u64,
    /// Connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            host: "https://api.orchestrate.io".to_string(),
            api_version: "v0".to_string(),
            timeout_secs: 60,
            connect_timeout_secs: 10,
            user_agent: concat!("orchestrate-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the default host with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Returns `{host}/{api_version}` without trailing slashes.
    pub fn base_url(&self) -> String {
        format!(
            "{}/{}",
            self.host.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }

    /// Returns the host without a trailing slash.
    pub fn host_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Checks that the configuration can produce request URLs.
    pub fn validate(&self) -> ClientResult<()> {
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "host must be an http(s) URL, got {:?}",
                self.host
            )));
        }
        if self.api_version.trim_matches('/').is_empty() {
            return Err(ClientError::Config("api_version must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("host", &self.host)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
