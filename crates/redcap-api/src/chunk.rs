//! Partitioning of id lists and rows into bounded chunks.

use std::collections::HashSet;

use redcap_model::RawRow;

use crate::error::{ApiError, Result};

/// Splits `items` into consecutive chunks of at most `max_chunk_size`.
///
/// Every chunk but the last is full; concatenating the chunks yields `items`.
pub fn partition<T>(items: &[T], max_chunk_size: usize) -> Result<Vec<&[T]>> {
    if max_chunk_size == 0 {
        return Err(ApiError::InvalidSettings(
            "max_chunk_size must be at least 1".to_string(),
        ));
    }
    Ok(items.chunks(max_chunk_size).collect())
}

/// Collects the distinct values of `id_var`, in first-seen order.
///
/// Longitudinal and repeating projects return one record per event or
/// instance, so ids repeat.
pub fn distinct_ids(records: &[RawRow], id_var: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for (position, record) in records.iter().enumerate() {
        let id = record.get(id_var).ok_or_else(|| {
            ApiError::UnexpectedResponse(format!(
                "record {position} has no '{id_var}' value"
            ))
        })?;
        if seen.insert(id.as_str()) {
            ids.push(id.clone());
        }
    }
    Ok(ids)
}
