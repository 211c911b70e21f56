//! Record retrieval: single-shot and filtered, chunked exports.

use std::fmt;

use redcap_model::RawRow;
use tracing::{debug, info};

use crate::chunk::{distinct_ids, partition};
use crate::config::{ClientSettings, Endpoint};
use crate::coordinator::{dispatch, reduce_outcomes};
use crate::error::Result;
use crate::request::export_records_payload;
use crate::transform::{Records, ResponseTransform};
use crate::transport::{Transport, send_one};

/// Client-side predicate over raw records.
pub type RecordFilter = Box<dyn Fn(&RawRow) -> bool + Send + Sync>;

/// Selection of an export.
///
/// Without an `id_var` the export is one request. With an `id_var`, the ids
/// (and `filter_vars`) are fetched first, filtered, and the full selection is
/// then requested in chunks of ids.
#[derive(Default)]
pub struct ExportRequest {
    /// Record id field. Enables chunked retrieval.
    pub id_var: Option<String>,
    /// Restrict the export to these record ids.
    pub ids: Option<Vec<String>>,
    pub filter: Option<RecordFilter>,
    /// Fields the filter reads, fetched alongside `id_var`.
    pub filter_vars: Vec<String>,
    /// Fields to export; all fields when unset.
    pub variables: Option<Vec<String>>,
    pub forms: Option<Vec<String>>,
    pub events: Option<Vec<String>>,
}

impl fmt::Debug for ExportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportRequest")
            .field("id_var", &self.id_var)
            .field("ids", &self.ids.as_ref().map(Vec::len))
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .field("filter_vars", &self.filter_vars)
            .field("variables", &self.variables)
            .field("forms", &self.forms)
            .field("events", &self.events)
            .finish()
    }
}

impl ExportRequest {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id_var(mut self, id_var: impl Into<String>) -> Self {
        self.id_var = Some(id_var.into());
        self
    }

    #[must_use]
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the client-side filter and the fields it reads.
    #[must_use]
    pub fn with_filter<I, S, F>(mut self, filter_vars: I, filter: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&RawRow) -> bool + Send + Sync + 'static,
    {
        self.filter_vars = filter_vars.into_iter().map(Into::into).collect();
        self.filter = Some(Box::new(filter));
        self
    }

    #[must_use]
    pub fn with_variables<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = Some(variables.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_forms<I, S>(mut self, forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forms = Some(forms.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = Some(events.into_iter().map(Into::into).collect());
        self
    }

    /// Fields of the id discovery request: `id_var` then each filter field once.
    fn discovery_fields(&self, id_var: &str) -> Vec<String> {
        let mut fields = vec![id_var.to_string()];
        for name in &self.filter_vars {
            if !fields.contains(name) {
                fields.push(name.clone());
            }
        }
        fields
    }

    fn keeps(&self, record: &RawRow) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(record))
    }
}

/// Exports records and shapes them with `transform`.
pub async fn export<T, R>(
    transport: &T,
    endpoint: &Endpoint,
    settings: &ClientSettings,
    request: &ExportRequest,
    transform: &R,
) -> Result<R::Output>
where
    T: Transport,
    R: ResponseTransform,
{
    settings.validate()?;
    match request.id_var.as_deref() {
        None => export_single(transport, endpoint, request, transform).await,
        Some(id_var) => {
            export_chunked(transport, endpoint, settings, request, id_var, transform).await
        }
    }
}

async fn export_single<T, R>(
    transport: &T,
    endpoint: &Endpoint,
    request: &ExportRequest,
    transform: &R,
) -> Result<R::Output>
where
    T: Transport,
    R: ResponseTransform,
{
    debug!(?request, "exporting records in one request");
    let payload = export_records_payload(
        &endpoint.token,
        request.ids.as_deref(),
        request.variables.as_deref(),
        request.forms.as_deref(),
        request.events.as_deref(),
    );
    let output = send_one(transport, &endpoint.url, &payload, transform).await?;
    transform.combine(vec![output])
}

async fn export_chunked<T, R>(
    transport: &T,
    endpoint: &Endpoint,
    settings: &ClientSettings,
    request: &ExportRequest,
    id_var: &str,
    transform: &R,
) -> Result<R::Output>
where
    T: Transport,
    R: ResponseTransform,
{
    let fields = request.discovery_fields(id_var);
    let discovery = export_records_payload(
        &endpoint.token,
        request.ids.as_deref(),
        Some(fields.as_slice()),
        None::<&[String]>,
        request.events.as_deref(),
    );
    let records = send_one(transport, &endpoint.url, &discovery, &Records).await?;
    let discovered = records.len();

    let kept: Vec<RawRow> = records
        .into_iter()
        .filter(|record| request.keeps(record))
        .collect();
    debug!(discovered, kept = kept.len(), "filtered discovered records");
    if kept.is_empty() {
        info!(%id_var, "no records left after filtering");
        return transform.empty();
    }

    let ids = distinct_ids(&kept, id_var)?;
    let chunks = partition(&ids, settings.max_chunk_size)?;
    let sizes: Vec<usize> = chunks.iter().map(|chunk| chunk.len()).collect();
    let payloads: Vec<_> = chunks
        .into_iter()
        .map(|chunk| {
            export_records_payload(
                &endpoint.token,
                Some(chunk),
                request.variables.as_deref(),
                request.forms.as_deref(),
                request.events.as_deref(),
            )
        })
        .collect();
    info!(
        ids = ids.len(),
        chunks = payloads.len(),
        parallel = settings.parallel_calls,
        "exporting records in chunks"
    );

    let outcomes = dispatch(
        transport,
        &endpoint.url,
        &payloads,
        settings.parallel_calls,
        transform,
    )
    .await?;
    reduce_outcomes(outcomes, &sizes, transform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_fields_dedup() {
        let request = ExportRequest::new()
            .with_id_var("record_id")
            .with_filter(["status", "record_id", "status"], |_| true);
        assert_eq!(request.discovery_fields("record_id"), ["record_id", "status"]);
    }

    #[test]
    fn test_keeps_without_filter() {
        let request = ExportRequest::new();
        assert!(request.keeps(&RawRow::new()));
    }

    #[test]
    fn test_debug_hides_ids() {
        let request = ExportRequest::new().with_ids(["1", "2"]).with_filter(
            ["status"],
            |record: &RawRow| record.contains_key("status"),
        );
        let debug = format!("{request:?}");
        assert!(debug.contains("Some(2)"));
        assert!(debug.contains("<fn>"));
    }
}
