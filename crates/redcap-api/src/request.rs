//! Form-encoded request payloads.
//!
//! Builders here are pure: they never validate tokens or field names, so a
//! malformed selection only surfaces as a remote error.

use std::fmt;

use serde::Serialize;

use crate::error::Result;

/// Flat, ordered key/value body of a REDCap API request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RequestPayload {
    pairs: Vec<(String, String)>,
}

impl RequestPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key/value pair.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Appends `{prefix}[i]` entries for every value, 0-indexed.
    pub fn push_indexed<S: AsRef<str>>(&mut self, prefix: &str, values: &[S]) {
        for (index, value) in values.iter().enumerate() {
            self.push(format!("{prefix}[{index}]"), value.as_ref());
        }
    }

    /// Returns the first value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Returns every `{prefix}[i]` value in index order.
    #[must_use]
    pub fn indexed(&self, prefix: &str) -> Vec<&str> {
        let mut values = Vec::new();
        while let Some(value) = self.get(&format!("{prefix}[{}]", values.len())) {
            values.push(value);
        }
        values
    }

    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Debug for RequestPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.pairs {
            match key.as_str() {
                "token" => map.entry(key, &"[REDACTED]"),
                "data" => map.entry(key, &format_args!("<{} bytes>", value.len())),
                _ => map.entry(key, value),
            };
        }
        map.finish()
    }
}

/// How an import treats blank values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteBehavior {
    /// Blank values are ignored.
    Normal,
    /// Blank values are valid and overwrite stored data.
    #[default]
    Overwrite,
}

impl OverwriteBehavior {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Overwrite => "overwrite",
        }
    }
}

/// Builds a flat JSON record export request.
///
/// Every collection that is `Some` adds positional `records[i]`, `fields[i]`,
/// `forms[i]` or `events[i]` keys in order.
pub fn export_records_payload<S: AsRef<str>>(
    token: &str,
    ids: Option<&[S]>,
    fields: Option<&[S]>,
    forms: Option<&[S]>,
    events: Option<&[S]>,
) -> RequestPayload {
    let mut payload = RequestPayload::new();
    payload.push("token", token);
    payload.push("content", "record");
    payload.push("format", "json");
    payload.push("type", "flat");
    payload.push("rawOrLabel", "raw");
    payload.push("rawOrLabelHeaders", "raw");
    payload.push("exportCheckboxLabel", "false");
    payload.push("exportSurveyFields", "false");
    payload.push("exportDataAccessGroups", "false");
    payload.push("returnFormat", "json");

    if let Some(ids) = ids {
        payload.push_indexed("records", ids);
    }
    if let Some(fields) = fields {
        payload.push_indexed("fields", fields);
    }
    if let Some(forms) = forms {
        payload.push_indexed("forms", forms);
    }
    if let Some(events) = events {
        payload.push_indexed("events", events);
    }
    payload
}

/// Builds a record import request for one chunk of rows.
///
/// The rows are JSON-encoded under `data`; the server answers with the
/// imported count only.
pub fn import_records_payload<R: Serialize>(
    token: &str,
    rows: &[R],
    overwrite: OverwriteBehavior,
) -> Result<RequestPayload> {
    let data = serde_json::to_string(rows)?;
    let mut payload = RequestPayload::new();
    payload.push("token", token);
    payload.push("content", "record");
    payload.push("format", "json");
    payload.push("type", "flat");
    payload.push("overwriteBehavior", overwrite.as_str());
    payload.push("forceAutoNumber", "false");
    payload.push("data", data);
    payload.push("returnContent", "count");
    payload.push("returnFormat", "json");
    Ok(payload)
}

/// Builds a data dictionary export request.
pub fn export_metadata_payload(token: &str) -> RequestPayload {
    let mut payload = RequestPayload::new();
    payload.push("token", token);
    payload.push("content", "metadata");
    payload.push("format", "json");
    payload.push("returnFormat", "json");
    payload
}
