mod common;

use redcap_api::{ApiError, Records, RequestPayload, dispatch, post_many};
use serde_json::json;

use common::{FakeTransport, URL, requested_ids};

fn payload_for(id: usize) -> RequestPayload {
    let mut payload = RequestPayload::new();
    payload.push_indexed("records", &[id.to_string()]);
    payload
}

#[tokio::test]
async fn seven_payloads_three_parallel_one_failure() {
    let transport = FakeTransport::new(|payload| {
        let id = requested_ids(payload).remove(0);
        if id == "4" {
            return Err(ApiError::Transport("connection reset by peer".to_string()));
        }
        Ok(json!([{ "record_id": id }]))
    });
    let payloads: Vec<_> = (1..=7).map(payload_for).collect();

    let outcomes = dispatch(&transport, URL, &payloads, 3, &Records)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 7);
    for (position, outcome) in outcomes.iter().enumerate() {
        let id = (position + 1).to_string();
        if position == 3 {
            assert!(matches!(outcome, Err(ApiError::Transport(_))));
        } else {
            let records = outcome.as_ref().unwrap();
            assert_eq!(records[0]["record_id"], id);
        }
    }
    assert_eq!(transport.requests().len(), 7);
    assert!(transport.max_in_flight() <= 3);
    assert!(transport.max_in_flight() > 1);
}

#[tokio::test]
async fn single_slot_runs_sequentially() {
    let transport = FakeTransport::new(|payload| Ok(json!([{ "record_id": requested_ids(payload)[0] }])));
    let payloads: Vec<_> = (1..=4).map(payload_for).collect();

    let outcomes = dispatch(&transport, URL, &payloads, 1, &Records)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 4);
    assert_eq!(transport.max_in_flight(), 1);
    let arrival: Vec<_> = transport
        .requests()
        .iter()
        .map(|payload| requested_ids(payload)[0].clone())
        .collect();
    assert_eq!(arrival, ["1", "2", "3", "4"]);
}

#[tokio::test]
async fn unreachable_endpoint_fails_per_request() {
    // Port 9 (discard) is closed on loopback, so every connect is refused.
    let payloads: Vec<_> = (1..=2).map(payload_for).collect();
    let outcomes = post_many(
        "http://127.0.0.1:9/api/",
        &payloads,
        2,
        &Default::default(),
        &Records,
    )
    .await
    .unwrap();

    assert_eq!(outcomes.len(), 2);
    for outcome in outcomes {
        let err = outcome.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.is_retryable());
    }
}
