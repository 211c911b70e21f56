//! Error types for the REDCap API client.

use std::fmt;

use redcap_model::ModelError;
use thiserror::Error;

/// Errors that can occur while talking to a REDCap project.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Connection, TLS or protocol failure below HTTP.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status or an error payload.
    #[error("REDCap API error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    /// The response body is not valid JSON.
    #[error("failed to decode response body: {0}")]
    Decode(String),

    /// The response is JSON but not of the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// An import response carried no numeric `count`.
    #[error("import response has no valid count: {body}")]
    MalformedWriteResponse { body: String },

    /// One or more chunk requests of a fan-out failed.
    #[error("{} of {total} chunk requests failed; first failure: {}", .failures.len(), first_failure(.failures))]
    ChunkFailures {
        total: usize,
        failures: Vec<ChunkFailure>,
    },

    /// Client settings are out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Metadata or coercion error.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Table conversion failed.
    #[error("table conversion failed: {0}")]
    Table(String),
}

impl ApiError {
    /// Returns whether a retry of the same request could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::RemoteApi { status, .. } => *status == 429 || *status >= 500,
            Self::ChunkFailures { failures, .. } => {
                failures.iter().all(|failure| failure.error.is_retryable())
            }
            _ => false,
        }
    }
}

/// A failed request of a chunked fan-out.
#[derive(Debug)]
pub struct ChunkFailure {
    /// Position of the chunk in submission order.
    pub index: usize,
    /// Number of record ids or rows the chunk carried.
    pub size: usize,
    pub error: ApiError,
}

impl fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk {} ({} items): {}", self.index, self.size, self.error)
    }
}

fn first_failure(failures: &[ChunkFailure]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<polars::prelude::PolarsError> for ApiError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::Table(err.to_string())
    }
}

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ApiError::Transport("reset".to_string()).is_retryable());
        assert!(
            ApiError::RemoteApi {
                status: 503,
                message: "busy".to_string()
            }
            .is_retryable()
        );
        assert!(
            !ApiError::RemoteApi {
                status: 403,
                message: "You do not have permissions to use the API".to_string()
            }
            .is_retryable()
        );
        assert!(
            !ApiError::MalformedWriteResponse {
                body: "{}".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_chunk_failures_display() {
        let err = ApiError::ChunkFailures {
            total: 4,
            failures: vec![ChunkFailure {
                index: 2,
                size: 500,
                error: ApiError::Transport("connection reset".to_string()),
            }],
        };
        assert_eq!(
            err.to_string(),
            "1 of 4 chunk requests failed; first failure: chunk 2 (500 items): transport error: connection reset"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_model_error_is_transparent() {
        let err: ApiError = ModelError::UnknownField {
            field: "age".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "field 'age' does not exist in the project metadata"
        );
    }
}
