//! Chunked record import.

use serde::Serialize;
use tracing::info;

use crate::chunk::partition;
use crate::config::{ClientSettings, Endpoint};
use crate::coordinator::{dispatch, reduce_outcomes};
use crate::error::{ApiError, Result};
use crate::request::{OverwriteBehavior, import_records_payload};
use crate::transform::ImportCount;
use crate::transport::Transport;

/// Imports `rows` in chunks of `max_chunk_size` and returns the number of
/// records the server reports as written.
///
/// A chunk whose response lacks a numeric `count` fails the whole call with
/// [`ApiError::MalformedWriteResponse`], even when other chunks were written.
pub async fn import<T, S>(
    transport: &T,
    endpoint: &Endpoint,
    settings: &ClientSettings,
    rows: &[S],
    overwrite: OverwriteBehavior,
) -> Result<u64>
where
    T: Transport,
    S: Serialize,
{
    settings.validate()?;
    if rows.is_empty() {
        return Ok(0);
    }

    let chunks = partition(rows, settings.max_chunk_size)?;
    let sizes: Vec<usize> = chunks.iter().map(|chunk| chunk.len()).collect();
    let payloads = chunks
        .into_iter()
        .map(|chunk| import_records_payload(&endpoint.token, chunk, overwrite))
        .collect::<Result<Vec<_>>>()?;
    info!(
        rows = rows.len(),
        chunks = payloads.len(),
        overwrite = overwrite.as_str(),
        "importing records"
    );

    let mut outcomes = dispatch(
        transport,
        &endpoint.url,
        &payloads,
        settings.parallel_calls,
        &ImportCount,
    )
    .await?;
    if let Some(position) = outcomes
        .iter()
        .position(|outcome| matches!(outcome, Err(ApiError::MalformedWriteResponse { .. })))
    {
        return outcomes.swap_remove(position);
    }

    let count = reduce_outcomes(outcomes, &sizes, &ImportCount)?;
    info!(count, "import complete");
    Ok(count)
}
