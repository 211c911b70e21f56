//! Single-request HTTP transport.

use std::future::Future;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::config::ConnectionOptions;
use crate::error::{ApiError, Result};
use crate::request::RequestPayload;
use crate::transform::ResponseTransform;

/// User agent string for API requests.
const USER_AGENT_VALUE: &str = concat!("redcap-api/", env!("CARGO_PKG_VERSION"));

/// Longest response excerpt kept in error messages.
const ERROR_BODY_LIMIT: usize = 512;

/// Issues one form-encoded POST and returns the decoded JSON body.
///
/// Implementations report failures as values and never retry.
pub trait Transport: Sync {
    fn post_form(
        &self,
        endpoint: &str,
        payload: &RequestPayload,
    ) -> impl Future<Output = Result<Value>> + Send;
}

/// Pooled HTTP transport backed by `reqwest`.
///
/// Cloning shares the underlying connection pool. The pool is released when
/// the last clone is dropped.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Opens a connection pool.
    pub fn new(options: &ConnectionOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT_VALUE)
            .pool_max_idle_per_host(options.max_connections.max(1))
            .danger_accept_invalid_certs(!options.verify_tls);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn post_form(&self, endpoint: &str, payload: &RequestPayload) -> Result<Value> {
        debug!(%endpoint, fields = payload.len(), "posting request");

        let response = self
            .client
            .post(endpoint)
            .form(payload.pairs())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        decode_body(status, &body)
    }
}

/// Decodes a response body, mapping error statuses and `{"error": ..}`
/// payloads to [`ApiError::RemoteApi`].
///
/// REDCap reports some failures with a success status and an error payload.
fn decode_body(status: StatusCode, body: &str) -> Result<Value> {
    if !status.is_success() {
        return Err(ApiError::RemoteApi {
            status: status.as_u16(),
            message: remote_error_message(body),
        });
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("{e}; body: {}", excerpt(body))))?;
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(ApiError::RemoteApi {
            status: status.as_u16(),
            message: message.to_string(),
        });
    }
    Ok(value)
}

/// Extracts the `error` member of a JSON error body, or an excerpt of the raw
/// text.
fn remote_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| excerpt(body))
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Sends one request over `transport` and applies `transform` to the body.
pub async fn send_one<T, R>(
    transport: &T,
    endpoint: &str,
    payload: &RequestPayload,
    transform: &R,
) -> Result<R::Output>
where
    T: Transport,
    R: ResponseTransform,
{
    let body = transport.post_form(endpoint, payload).await?;
    transform.apply(body)
}

/// Issues one POST, reusing `shared` when given.
///
/// Without a shared transport a pool is opened for this request and released
/// when it returns. A shared transport is never closed here.
pub async fn post_one<R: ResponseTransform>(
    endpoint: &str,
    payload: &RequestPayload,
    options: &ConnectionOptions,
    shared: Option<&HttpTransport>,
    transform: &R,
) -> Result<R::Output> {
    match shared {
        Some(transport) => send_one(transport, endpoint, payload, transform).await,
        None => {
            let transport = HttpTransport::new(options)?;
            send_one(&transport, endpoint, payload, transform).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        let transport = HttpTransport::new(&ConnectionOptions::default());
        assert!(transport.is_ok());
    }

    #[test]
    fn test_remote_error_message() {
        assert_eq!(
            remote_error_message(r#"{"error":"You do not have permissions to use the API"}"#),
            "You do not have permissions to use the API"
        );
        assert_eq!(remote_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_error_payload_with_success_status() {
        let err = decode_body(StatusCode::OK, r#"{"error":"The value of the parameter \"content\" is not valid"}"#)
            .unwrap_err();
        let ApiError::RemoteApi { status, message } = &err else {
            panic!("expected remote error, got {err:?}");
        };
        assert_eq!(*status, 200);
        assert!(message.contains("content"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_decode_body() {
        let value = decode_body(StatusCode::OK, r#"[{"record_id":"1"}]"#).unwrap();
        assert_eq!(value[0]["record_id"], "1");

        let err = decode_body(StatusCode::OK, "<html>maintenance</html>").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));

        let err = decode_body(StatusCode::FORBIDDEN, r#"{"error":"Invalid token"}"#).unwrap_err();
        assert!(matches!(
            err,
            ApiError::RemoteApi { status: 403, ref message } if message == "Invalid token"
        ));
        let err = decode_body(StatusCode::SERVICE_UNAVAILABLE, "busy").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_excerpt_truncates() {
        let body = "x".repeat(ERROR_BODY_LIMIT + 10);
        let short = excerpt(&body);
        assert_eq!(short.len(), ERROR_BODY_LIMIT + 3);
        assert!(short.ends_with("..."));
    }
}
