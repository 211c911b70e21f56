//! Chunked, concurrency-bounded client for the REDCap record API.
//!
//! # Overview
//!
//! - **Request builders** produce the flat form-encoded bodies the API expects
//! - **Transport** performs one POST and decodes the JSON body
//! - **Coordinator** fans payloads out with a bound on in-flight requests and
//!   returns every outcome in submission order
//! - **Export** fetches records in one request, or discovers and filters ids
//!   first and then fetches them in chunks
//! - **Import** writes rows in chunks and sums the reported counts
//!
//! Results are shaped by a [`ResponseTransform`]: raw records, a polars
//! table, or either of those coerced through project [`Metadata`].
//!
//! Any failed chunk fails the call with [`ApiError::ChunkFailures`]. Nothing
//! is retried.
//!
//! # Example
//!
//! ```no_run
//! use redcap_api::{ClientSettings, Endpoint, ExportRequest, RedcapClient};
//!
//! async fn completed_records() -> redcap_api::Result<()> {
//!     let endpoint = Endpoint::new("https://redcap.example.org/api/", "TOKEN");
//!     let client = RedcapClient::new(endpoint, ClientSettings::default())?;
//!
//!     let request = ExportRequest::new()
//!         .with_id_var("record_id")
//!         .with_filter(["status"], |record| {
//!             record.get("status").is_some_and(|status| status == "2")
//!         });
//!     let records = client.export_records(&request).await?;
//!     println!("{} records", records.len());
//!     Ok(())
//! }
//! ```
//!
//! [`Metadata`]: redcap_model::Metadata

mod chunk;
mod client;
mod config;
mod coordinator;
mod error;
mod export;
mod import;
mod metadata;
mod request;
mod transform;
mod transport;

// === Error Types ===
pub use error::{ApiError, ChunkFailure, Result};

// === Configuration ===
pub use config::{
    ClientSettings, ConnectionOptions, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_PARALLEL_CALLS, Endpoint,
};

// === Client ===
pub use client::RedcapClient;

// === Requests ===
pub use request::{
    OverwriteBehavior, RequestPayload, export_metadata_payload, export_records_payload,
    import_records_payload,
};

// === Transport & Coordination ===
pub use coordinator::{dispatch, post_many, reduce_outcomes};
pub use transport::{HttpTransport, Transport, post_one, send_one};

// === Retrieval ===
pub use chunk::{distinct_ids, partition};
pub use export::{ExportRequest, RecordFilter, export};
pub use import::import;
pub use metadata::export_metadata;

// === Response Transforms ===
pub use transform::{
    ImportCount, MetadataDocument, Records, ResponseTransform, Table, TypedRecords, TypedTable,
    records_from_value, records_to_frame, stack_frames,
};
