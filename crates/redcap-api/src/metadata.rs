//! Project metadata export.

use redcap_model::{Metadata, TypingPolicy};
use tracing::info;

use crate::config::Endpoint;
use crate::error::Result;
use crate::request::export_metadata_payload;
use crate::transform::MetadataDocument;
use crate::transport::{Transport, send_one};

/// Fetches the data dictionary and builds a [`Metadata`] index typed under
/// `policy`.
pub async fn export_metadata<T: Transport>(
    transport: &T,
    endpoint: &Endpoint,
    policy: TypingPolicy,
) -> Result<Metadata> {
    let payload = export_metadata_payload(&endpoint.token);
    let descriptors = send_one(transport, &endpoint.url, &payload, &MetadataDocument).await?;
    let metadata = Metadata::new(descriptors)?.with_policy(policy);
    info!(
        fields = metadata.raw_fields().len(),
        variables = metadata.expanded_fields().len(),
        "loaded project metadata"
    );
    Ok(metadata)
}
