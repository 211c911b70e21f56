mod common;

use redcap_api::{
    ApiError, ClientSettings, ExportRequest, Records, Table, TypedRecords, export,
};
use redcap_model::{FieldDescriptor, Metadata, RawRow, TypedValue};
use serde_json::{Value, json};

use common::{FakeTransport, TOKEN, endpoint, requested_ids};

/// Ids 4 and 7 have no status; id 2 appears twice (two events).
fn discovery_response() -> Value {
    json!([
        {"record_id": "1", "status": "2"},
        {"record_id": "2", "status": "1"},
        {"record_id": "2", "status": "2"},
        {"record_id": "3", "status": "2"},
        {"record_id": "4"},
        {"record_id": "5", "status": "0"},
        {"record_id": "6", "status": "2"},
        {"record_id": "7"}
    ])
}

fn is_discovery(payload: &redcap_api::RequestPayload) -> bool {
    payload.get("records[0]").is_none()
}

fn record_for(id: &str) -> Value {
    json!({"record_id": id, "age": format!("{id}0"), "status": "2"})
}

fn has_status(record: &RawRow) -> bool {
    record.contains_key("status")
}

fn settings(max_chunk_size: usize) -> ClientSettings {
    ClientSettings::default()
        .with_max_chunk_size(max_chunk_size)
        .with_parallel_calls(2)
}

#[tokio::test]
async fn filtered_export_chunks_surviving_ids() {
    let transport = FakeTransport::new(|payload| {
        if is_discovery(payload) {
            return Ok(discovery_response());
        }
        let records: Vec<Value> = requested_ids(payload)
            .iter()
            .map(|id| record_for(id))
            .collect();
        Ok(Value::Array(records))
    });
    let request = ExportRequest::new()
        .with_id_var("record_id")
        .with_filter(["status"], has_status)
        .with_variables(["record_id", "age", "status"]);

    let records = export(&transport, &endpoint(), &settings(2), &request, &Records)
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 4);

    let discovery = &requests[0];
    assert_eq!(discovery.get("token"), Some(TOKEN));
    assert_eq!(discovery.indexed("fields"), ["record_id", "status"]);

    let mut chunks: Vec<Vec<String>> = requests[1..].iter().map(requested_ids).collect();
    chunks.sort();
    assert_eq!(
        chunks,
        [vec!["1", "2"], vec!["3", "5"], vec!["6"]]
    );
    for chunk in &requests[1..] {
        assert_eq!(chunk.indexed("fields"), ["record_id", "age", "status"]);
    }

    let ids: Vec<&str> = records
        .iter()
        .map(|record| record["record_id"].as_str())
        .collect();
    assert_eq!(ids, ["1", "2", "3", "5", "6"]);
    assert_eq!(records[2]["age"], "30");
}

#[tokio::test]
async fn global_export_is_single_request() {
    let transport = FakeTransport::new(|_| {
        Ok(json!([
            {"record_id": "1", "age": 30},
            {"record_id": "2", "age": null}
        ]))
    });
    let request = ExportRequest::new()
        .with_forms(["demographics"])
        .with_events(["baseline_arm_1"]);

    let records = export(&transport, &endpoint(), &settings(500), &request, &Records)
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].get("content"), Some("record"));
    assert_eq!(requests[0].indexed("forms"), ["demographics"]);
    assert_eq!(requests[0].indexed("events"), ["baseline_arm_1"]);
    assert!(requests[0].indexed("records").is_empty());

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["age"], "30");
    assert_eq!(records[1]["age"], "");
}

#[tokio::test]
async fn nothing_left_after_filter_returns_empty() {
    let transport = FakeTransport::new(|_| Ok(discovery_response()));
    let request = ExportRequest::new()
        .with_id_var("record_id")
        .with_filter(["status"], |record: &RawRow| {
            record.get("status").is_some_and(|status| status == "9")
        });

    let table = export(&transport, &endpoint(), &settings(2), &request, &Table)
        .await
        .unwrap();

    assert_eq!(transport.requests().len(), 1);
    assert_eq!(table.height(), 0);
}

#[tokio::test]
async fn explicit_ids_are_sent_with_discovery() {
    let transport = FakeTransport::new(|payload| {
        Ok(Value::Array(
            requested_ids(payload).iter().map(|id| record_for(id)).collect(),
        ))
    });
    let request = ExportRequest::new()
        .with_id_var("record_id")
        .with_ids(["5", "6"]);

    let records = export(&transport, &endpoint(), &settings(500), &request, &Records)
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requested_ids(&requests[0]), ["5", "6"]);
    assert_eq!(requests[0].indexed("fields"), ["record_id"]);
    assert!(requests[1].indexed("fields").is_empty());
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn failed_chunk_fails_the_export() {
    let transport = FakeTransport::new(|payload| {
        if is_discovery(payload) {
            return Ok(discovery_response());
        }
        let ids = requested_ids(payload);
        if ids.contains(&"3".to_string()) {
            return Err(ApiError::RemoteApi {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(Value::Array(ids.iter().map(|id| record_for(id)).collect()))
    });
    let request = ExportRequest::new()
        .with_id_var("record_id")
        .with_filter(["status"], has_status);

    let err = export(&transport, &endpoint(), &settings(2), &request, &Records)
        .await
        .unwrap_err();

    let ApiError::ChunkFailures { total, failures } = &err else {
        panic!("expected chunk failures, got {err:?}");
    };
    assert_eq!(*total, 3);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 1);
    assert_eq!(failures[0].size, 2);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn failed_discovery_is_returned_directly() {
    let transport = FakeTransport::new(|_| {
        Err(ApiError::RemoteApi {
            status: 403,
            message: "You do not have permissions to use the API".to_string(),
        })
    });
    let request = ExportRequest::new().with_id_var("record_id");

    let err = export(&transport, &endpoint(), &settings(2), &request, &Records)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::RemoteApi { status: 403, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn chunked_table_export_stacks_chunks() {
    let transport = FakeTransport::new(|payload| {
        if is_discovery(payload) {
            return Ok(discovery_response());
        }
        Ok(Value::Array(
            requested_ids(payload).iter().map(|id| record_for(id)).collect(),
        ))
    });
    let request = ExportRequest::new()
        .with_id_var("record_id")
        .with_filter(["status"], has_status);

    let table = export(&transport, &endpoint(), &settings(2), &request, &Table)
        .await
        .unwrap();

    assert_eq!(table.height(), 5);
    let ids: Vec<_> = table
        .column("record_id")
        .unwrap()
        .str()
        .unwrap()
        .iter()
        .flatten()
        .collect();
    assert_eq!(ids, ["1", "2", "3", "5", "6"]);
}

#[tokio::test]
async fn typed_export_coerces_known_fields() {
    let metadata = Metadata::new(vec![
        FieldDescriptor::new("record_id", "text"),
        FieldDescriptor::new("age", "text").with_validation("integer"),
        FieldDescriptor::new("status", "radio").with_choices("0, Incomplete | 1, Unverified | 2, Complete"),
    ])
    .unwrap();
    let transport = FakeTransport::new(|_| Ok(json!([record_for("4")])));

    let rows = export(
        &transport,
        &endpoint(),
        &settings(500),
        &ExportRequest::new(),
        &TypedRecords { metadata: &metadata },
    )
    .await
    .unwrap();

    assert_eq!(rows[0]["age"], Some(TypedValue::Int(40)));
    assert_eq!(rows[0]["status"], Some(TypedValue::Text("Complete".to_string())));
}

#[tokio::test]
async fn invalid_settings_send_nothing() {
    let transport = FakeTransport::new(|_| Ok(json!([])));
    let err = export(
        &transport,
        &endpoint(),
        &ClientSettings::default().with_max_chunk_size(0),
        &ExportRequest::new().with_id_var("record_id"),
        &Records,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::InvalidSettings(_)));
    assert!(transport.requests().is_empty());
}
