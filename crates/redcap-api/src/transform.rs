//! Conversions of decoded response bodies into caller-facing results.
//!
//! A [`ResponseTransform`] is applied to each successful response of a fan-out
//! and then combines the per-chunk outputs in submission order.

use std::collections::HashMap;

use indexmap::IndexSet;
use polars::prelude::{Column, DataFrame, DataType};
use redcap_model::{FieldDescriptor, Metadata, RawRow, TypedRow, TypedValue};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

/// Shapes response bodies into results.
pub trait ResponseTransform: Sync {
    type Output: Send;

    /// Converts one decoded response body.
    fn apply(&self, body: Value) -> Result<Self::Output>;

    /// Joins per-chunk outputs, given in submission order.
    fn combine(&self, parts: Vec<Self::Output>) -> Result<Self::Output>;

    /// Result of an export with no remaining records.
    fn empty(&self) -> Result<Self::Output>;
}

/// Records as ordered maps of raw string values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Records;

impl ResponseTransform for Records {
    type Output = Vec<RawRow>;

    fn apply(&self, body: Value) -> Result<Self::Output> {
        records_from_value(body)
    }

    fn combine(&self, parts: Vec<Self::Output>) -> Result<Self::Output> {
        Ok(parts.into_iter().flatten().collect())
    }

    fn empty(&self) -> Result<Self::Output> {
        Ok(Vec::new())
    }
}

/// Records as a polars table of string columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Table;

impl ResponseTransform for Table {
    type Output = DataFrame;

    fn apply(&self, body: Value) -> Result<Self::Output> {
        records_to_frame(&records_from_value(body)?)
    }

    fn combine(&self, parts: Vec<Self::Output>) -> Result<Self::Output> {
        stack_frames(parts)
    }

    fn empty(&self) -> Result<Self::Output> {
        Ok(DataFrame::empty())
    }
}

/// Records coerced through project metadata.
///
/// Columns the metadata does not know (such as `redcap_event_name`) are kept
/// as text.
#[derive(Debug, Clone, Copy)]
pub struct TypedRecords<'m> {
    pub metadata: &'m Metadata,
}

impl ResponseTransform for TypedRecords<'_> {
    type Output = Vec<TypedRow>;

    fn apply(&self, body: Value) -> Result<Self::Output> {
        records_from_value(body)?
            .iter()
            .map(|row| typed_row(self.metadata, row))
            .collect()
    }

    fn combine(&self, parts: Vec<Self::Output>) -> Result<Self::Output> {
        Ok(parts.into_iter().flatten().collect())
    }

    fn empty(&self) -> Result<Self::Output> {
        Ok(Vec::new())
    }
}

fn typed_row(metadata: &Metadata, row: &RawRow) -> Result<TypedRow> {
    let mut typed = TypedRow::new();
    for (name, raw) in row {
        let value = if metadata.exists(name) {
            metadata.coerce_value(name, raw)?
        } else if raw.is_empty() {
            None
        } else {
            Some(TypedValue::Text(raw.clone()))
        };
        typed.insert(name.clone(), value);
    }
    Ok(typed)
}

/// Records as a polars table with columns coerced through project metadata.
#[derive(Debug, Clone, Copy)]
pub struct TypedTable<'m> {
    pub metadata: &'m Metadata,
}

impl ResponseTransform for TypedTable<'_> {
    type Output = DataFrame;

    fn apply(&self, body: Value) -> Result<Self::Output> {
        let frame = Table.apply(body)?;
        Ok(self.metadata.coerce_frame(&frame)?)
    }

    fn combine(&self, parts: Vec<Self::Output>) -> Result<Self::Output> {
        stack_frames(parts)
    }

    fn empty(&self) -> Result<Self::Output> {
        Ok(DataFrame::empty())
    }
}

/// Number of records written by an import.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportCount;

impl ResponseTransform for ImportCount {
    type Output = u64;

    fn apply(&self, body: Value) -> Result<Self::Output> {
        let count = match body.get("count") {
            Some(Value::Number(number)) => number.as_u64(),
            Some(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        };
        count.ok_or_else(|| ApiError::MalformedWriteResponse {
            body: body.to_string(),
        })
    }

    fn combine(&self, parts: Vec<Self::Output>) -> Result<Self::Output> {
        Ok(parts.into_iter().sum())
    }

    fn empty(&self) -> Result<Self::Output> {
        Ok(0)
    }
}

/// The project data dictionary.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataDocument;

impl ResponseTransform for MetadataDocument {
    type Output = Vec<FieldDescriptor>;

    fn apply(&self, body: Value) -> Result<Self::Output> {
        if !body.is_array() {
            return Err(ApiError::UnexpectedResponse(
                "metadata export is not a JSON array".to_string(),
            ));
        }
        Ok(serde_json::from_value(body)?)
    }

    fn combine(&self, parts: Vec<Self::Output>) -> Result<Self::Output> {
        Ok(parts.into_iter().flatten().collect())
    }

    fn empty(&self) -> Result<Self::Output> {
        Ok(Vec::new())
    }
}

/// Converts a flat record export into raw rows.
///
/// Scalars are rendered as strings and `null` as the empty string. Nested
/// values are rejected.
pub fn records_from_value(body: Value) -> Result<Vec<RawRow>> {
    let Value::Array(items) = body else {
        return Err(ApiError::UnexpectedResponse(
            "record export is not a JSON array".to_string(),
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| match item {
            Value::Object(object) => row_from_object(position, object),
            other => Err(ApiError::UnexpectedResponse(format!(
                "record {position} is not an object: {other}"
            ))),
        })
        .collect()
}

fn row_from_object(position: usize, object: Map<String, Value>) -> Result<RawRow> {
    object
        .into_iter()
        .map(|(key, value)| {
            let raw = match value {
                Value::String(text) => text,
                Value::Null => String::new(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                nested => {
                    return Err(ApiError::UnexpectedResponse(format!(
                        "record {position} field '{key}' is not a scalar: {nested}"
                    )));
                }
            };
            Ok((key, raw))
        })
        .collect()
}

/// Builds a string table from raw rows.
///
/// Columns appear in the order their names are first seen; rows missing a
/// column get a null there.
pub fn records_to_frame(rows: &[RawRow]) -> Result<DataFrame> {
    let names: IndexSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    let columns = names
        .into_iter()
        .map(|name| {
            let values: Vec<Option<&str>> = rows
                .iter()
                .map(|row| row.get(name).map(String::as_str))
                .collect();
            Column::new(name.into(), values)
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Stacks tables vertically, aligning columns by name.
///
/// A column absent from some part is filled with nulls of the type it has in
/// the first part that carries it.
pub fn stack_frames(parts: Vec<DataFrame>) -> Result<DataFrame> {
    let mut order: Vec<String> = Vec::new();
    let mut dtypes: HashMap<String, DataType> = HashMap::new();
    for frame in &parts {
        for column in frame.get_columns() {
            let name = column.name().to_string();
            if !dtypes.contains_key(&name) {
                dtypes.insert(name.clone(), column.dtype().clone());
                order.push(name);
            }
        }
    }
    if order.is_empty() {
        return Ok(DataFrame::empty());
    }

    let mut stacked: Option<DataFrame> = None;
    for frame in parts {
        let height = frame.height();
        let columns = order
            .iter()
            .map(|name| match frame.column(name) {
                Ok(column) => column.clone(),
                Err(_) => Column::full_null(name.as_str().into(), height, &dtypes[name]),
            })
            .collect();
        let aligned = DataFrame::new(columns)?;
        match stacked.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&aligned)?;
            }
            None => stacked = Some(aligned),
        }
    }
    Ok(stacked.unwrap_or_else(DataFrame::empty))
}
