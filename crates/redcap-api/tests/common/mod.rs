//! In-memory transport for exercising the client without a network.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use redcap_api::{Endpoint, RequestPayload, Result, Transport};
use serde_json::Value;

pub const URL: &str = "https://redcap.example.org/api/";
pub const TOKEN: &str = "0123456789ABCDEF0123456789ABCDEF";

pub fn endpoint() -> Endpoint {
    Endpoint::new(URL, TOKEN)
}

/// Answers each request with a scripted response after a few scheduler
/// yields, so concurrent requests overlap and complete out of order.
pub struct FakeTransport<F> {
    respond: F,
    requests: Mutex<Vec<RequestPayload>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl<F> FakeTransport<F>
where
    F: Fn(&RequestPayload) -> Result<Value> + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every payload received, in arrival order.
    pub fn requests(&self) -> Vec<RequestPayload> {
        self.requests.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl<F> Transport for FakeTransport<F>
where
    F: Fn(&RequestPayload) -> Result<Value> + Sync,
{
    async fn post_form(&self, endpoint: &str, payload: &RequestPayload) -> Result<Value> {
        assert_eq!(endpoint, URL);
        let arrival = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(payload.clone());
            requests.len()
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Earlier arrivals wait longer.
        for _ in 0..(12usize.saturating_sub(arrival % 6 * 2)) {
            tokio::task::yield_now().await;
        }
        let response = (self.respond)(payload);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

/// Ids requested through `records[i]`.
pub fn requested_ids(payload: &RequestPayload) -> Vec<String> {
    payload
        .indexed("records")
        .into_iter()
        .map(str::to_string)
        .collect()
}
