//! Concurrency-bounded fan-out of prepared requests.

use futures_util::{StreamExt, stream::FuturesUnordered};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::ConnectionOptions;
use crate::error::{ApiError, ChunkFailure, Result};
use crate::request::RequestPayload;
use crate::transform::ResponseTransform;
use crate::transport::{HttpTransport, Transport, send_one};

/// Sends every payload over `transport` with at most `max_parallel` requests
/// in flight.
///
/// The returned outcomes are in payload order regardless of completion order.
/// A failed request does not cancel its siblings.
pub async fn dispatch<T, R>(
    transport: &T,
    endpoint: &str,
    payloads: &[RequestPayload],
    max_parallel: usize,
    transform: &R,
) -> Result<Vec<Result<R::Output>>>
where
    T: Transport,
    R: ResponseTransform,
{
    if max_parallel == 0 {
        return Err(ApiError::InvalidSettings(
            "max_parallel must be at least 1".to_string(),
        ));
    }
    debug!(requests = payloads.len(), max_parallel, "dispatching requests");

    let semaphore = Semaphore::new(max_parallel);
    let mut pending: FuturesUnordered<_> = payloads
        .iter()
        .enumerate()
        .map(|(index, payload)| {
            let semaphore = &semaphore;
            async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => send_one(transport, endpoint, payload, transform).await,
                    Err(_) => Err(ApiError::Transport(
                        "request admission closed".to_string(),
                    )),
                };
                (index, outcome)
            }
        })
        .collect();

    let mut outcomes = Vec::with_capacity(payloads.len());
    while let Some((index, outcome)) = pending.next().await {
        match &outcome {
            Ok(_) => debug!(index, "request completed"),
            Err(error) => warn!(index, %error, "request failed"),
        }
        outcomes.push((index, outcome));
    }
    outcomes.sort_unstable_by_key(|(index, _)| *index);
    Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
}

/// Opens a connection pool for one fan-out and dispatches `payloads` over it.
///
/// The pool is released when this returns.
pub async fn post_many<R: ResponseTransform>(
    endpoint: &str,
    payloads: &[RequestPayload],
    max_parallel: usize,
    options: &ConnectionOptions,
    transform: &R,
) -> Result<Vec<Result<R::Output>>> {
    let options = ConnectionOptions {
        max_connections: max_parallel,
        ..*options
    };
    let transport = HttpTransport::new(&options)?;
    dispatch(&transport, endpoint, payloads, max_parallel, transform).await
}

/// Reduces ordered per-chunk outcomes into one result.
///
/// Any failed chunk fails the whole call with [`ApiError::ChunkFailures`];
/// `sizes[i]` is the number of items chunk `i` carried.
pub fn reduce_outcomes<R: ResponseTransform>(
    outcomes: Vec<Result<R::Output>>,
    sizes: &[usize],
    transform: &R,
) -> Result<R::Output> {
    let total = outcomes.len();
    let mut parts = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(part) => parts.push(part),
            Err(error) => failures.push(ChunkFailure {
                index,
                size: sizes.get(index).copied().unwrap_or_default(),
                error,
            }),
        }
    }
    if !failures.is_empty() {
        return Err(ApiError::ChunkFailures { total, failures });
    }
    transform.combine(parts)
}
