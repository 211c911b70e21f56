//! High-level client bound to one project endpoint.

use polars::prelude::DataFrame;
use redcap_model::{Metadata, RawRow, TypedRow, TypingPolicy};
use serde::Serialize;

use crate::config::{ClientSettings, Endpoint};
use crate::error::Result;
use crate::export::{ExportRequest, export};
use crate::import::import;
use crate::metadata::export_metadata;
use crate::request::OverwriteBehavior;
use crate::transform::{Records, ResponseTransform, Table, TypedRecords, TypedTable};
use crate::transport::HttpTransport;

/// REDCap project client.
///
/// Each call opens a connection pool sized to `parallel_calls` and releases
/// it on return, unless a shared pool was attached with
/// [`RedcapClient::with_shared_transport`].
#[derive(Debug, Clone)]
pub struct RedcapClient {
    endpoint: Endpoint,
    settings: ClientSettings,
    shared: Option<HttpTransport>,
}

impl RedcapClient {
    /// Creates a client, validating `settings`.
    pub fn new(endpoint: Endpoint, settings: ClientSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            endpoint,
            settings,
            shared: None,
        })
    }

    /// Reuses `transport` for every call instead of opening a pool per call.
    #[must_use]
    pub fn with_shared_transport(mut self, transport: HttpTransport) -> Self {
        self.shared = Some(transport);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn transport(&self) -> Result<HttpTransport> {
        match &self.shared {
            Some(transport) => Ok(transport.clone()),
            None => HttpTransport::new(&self.settings.connection_options()),
        }
    }

    /// Exports records shaped by `transform`.
    pub async fn export<R: ResponseTransform>(
        &self,
        request: &ExportRequest,
        transform: &R,
    ) -> Result<R::Output> {
        let transport = self.transport()?;
        export(&transport, &self.endpoint, &self.settings, request, transform).await
    }

    pub async fn export_records(&self, request: &ExportRequest) -> Result<Vec<RawRow>> {
        self.export(request, &Records).await
    }

    pub async fn export_table(&self, request: &ExportRequest) -> Result<DataFrame> {
        self.export(request, &Table).await
    }

    /// Exports records coerced through `metadata`.
    pub async fn export_typed(
        &self,
        request: &ExportRequest,
        metadata: &Metadata,
    ) -> Result<Vec<TypedRow>> {
        self.export(request, &TypedRecords { metadata }).await
    }

    /// Exports a table with columns coerced through `metadata`.
    pub async fn export_typed_table(
        &self,
        request: &ExportRequest,
        metadata: &Metadata,
    ) -> Result<DataFrame> {
        self.export(request, &TypedTable { metadata }).await
    }

    pub async fn export_metadata(&self, policy: TypingPolicy) -> Result<Metadata> {
        let transport = self.transport()?;
        export_metadata(&transport, &self.endpoint, policy).await
    }

    /// Imports `rows` and returns the number of records written.
    pub async fn import<S: Serialize>(
        &self,
        rows: &[S],
        overwrite: OverwriteBehavior,
    ) -> Result<u64> {
        let transport = self.transport()?;
        import(&transport, &self.endpoint, &self.settings, rows, overwrite).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn test_new_validates_settings() {
        let endpoint = Endpoint::new("https://redcap.example.org/api/", "TOKEN");
        let err = RedcapClient::new(endpoint, ClientSettings::default().with_parallel_calls(0))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidSettings(_)));
    }

    #[tokio::test]
    async fn test_import_nothing_sends_nothing() {
        let endpoint = Endpoint::new("http://127.0.0.1:9/api/", "TOKEN");
        let client = RedcapClient::new(endpoint, ClientSettings::default()).unwrap();
        let rows: Vec<RawRow> = Vec::new();
        assert_eq!(
            client.import(&rows, OverwriteBehavior::Normal).await.unwrap(),
            0
        );
    }
}
