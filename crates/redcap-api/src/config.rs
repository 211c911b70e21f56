//! Client configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Default number of record ids (or rows) per request.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 500;

/// Default number of requests in flight at once.
pub const DEFAULT_PARALLEL_CALLS: usize = 10;

/// Location and credentials of a REDCap project API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// API url, e.g. `https://redcap.example.org/api/`.
    pub url: String,
    /// Project API token.
    pub token: String,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Tuning of chunked requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Maximum record ids (export) or rows (import) per request.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Maximum requests in flight at once.
    #[serde(default = "default_parallel_calls")]
    pub parallel_calls: usize,

    /// Whether to verify the server's TLS certificate.
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,

    /// Per-request timeout. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}

fn default_parallel_calls() -> usize {
    DEFAULT_PARALLEL_CALLS
}

fn default_ssl_verify() -> bool {
    true
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            parallel_calls: DEFAULT_PARALLEL_CALLS,
            ssl_verify: true,
            request_timeout_secs: None,
        }
    }
}

impl ClientSettings {
    #[must_use]
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    #[must_use]
    pub fn with_parallel_calls(mut self, parallel_calls: usize) -> Self {
        self.parallel_calls = parallel_calls;
        self
    }

    #[must_use]
    pub fn with_ssl_verify(mut self, ssl_verify: bool) -> Self {
        self.ssl_verify = ssl_verify;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout_secs = timeout.map(|timeout| timeout.as_secs());
        self
    }

    /// Checks that chunk size and parallelism are at least one.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(ApiError::InvalidSettings(
                "max_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.parallel_calls == 0 {
            return Err(ApiError::InvalidSettings(
                "parallel_calls must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Connection pool options matching these settings.
    #[must_use]
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            verify_tls: self.ssl_verify,
            max_connections: self.parallel_calls,
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Options for opening an HTTP connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub verify_tls: bool,
    /// Upper bound of pooled connections per host.
    pub max_connections: usize,
    pub timeout: Option<Duration>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            verify_tls: true,
            max_connections: DEFAULT_PARALLEL_CALLS,
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.max_chunk_size, 500);
        assert_eq!(settings.parallel_calls, 10);
        assert!(settings.ssl_verify);
        assert!(settings.request_timeout_secs.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_deserialize_defaults() {
        let settings: ClientSettings = serde_json::from_str(r#"{"parallel_calls": 3}"#).unwrap();
        assert_eq!(settings.parallel_calls, 3);
        assert_eq!(settings.max_chunk_size, DEFAULT_MAX_CHUNK_SIZE);
        assert!(settings.ssl_verify);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let err = ClientSettings::default()
            .with_max_chunk_size(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidSettings(_)));
        assert!(
            ClientSettings::default()
                .with_parallel_calls(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_endpoint_debug_redacts_token() {
        let endpoint = Endpoint::new("https://redcap.example.org/api/", "0123456789ABCDEF");
        let debug = format!("{endpoint:?}");
        assert!(debug.contains("redcap.example.org"));
        assert!(!debug.contains("0123456789ABCDEF"));
    }
}
