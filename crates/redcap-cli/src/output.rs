//! Reading and writing record files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use redcap_model::RawRow;
use serde::Serialize;
use serde_json::{Map, Value};

/// A flat record as read from an import file.
pub type JsonRecord = Map<String, Value>;

/// Opens `path` for writing, or stdout when `None`.
fn sink(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let mut writer = sink(path)?;
    serde_json::to_writer_pretty(&mut writer, value).context("serialize records")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes `frame` as CSV with a header row.
pub fn write_csv(frame: &mut DataFrame, path: Option<&Path>) -> Result<()> {
    let mut writer = sink(path)?;
    CsvWriter::new(&mut writer)
        .include_header(true)
        .finish(frame)
        .context("write csv")?;
    writer.flush()?;
    Ok(())
}

/// Reads an import file: a JSON array of flat objects.
pub fn read_records(path: &Path) -> Result<Vec<JsonRecord>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let value: Value = serde_json::from_reader(io::BufReader::new(file))
        .with_context(|| format!("parse {}", path.display()))?;
    let Value::Array(items) = value else {
        bail!("{} does not hold a JSON array", path.display());
    };
    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| match item {
            Value::Object(record) => Ok(record),
            _ => bail!("record {position} in {} is not an object", path.display()),
        })
        .collect()
}

/// Returns whether every field in `required` has a non-empty value.
pub fn has_required(record: &RawRow, required: &[String]) -> bool {
    required
        .iter()
        .all(|field| record.get(field).is_some_and(|value| !value.is_empty()))
}
