//! Column-wise coercion of string tables.

use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::{Column, DataFrame, DataType, StringChunked};
use tracing::debug;

use crate::coerce::{parse_date, parse_float, parse_int_prefix};
use crate::error::{ModelError, Result};
use crate::metadata::Metadata;
use crate::types::LogicalType;

impl Metadata {
    /// Coerces a whole column of raw strings for field `name`.
    ///
    /// Nulls and empty strings become nulls. Choice fields yield decoded string
    /// labels, numeric fields `Float64`/`Int64`, dates `Date`. Input columns
    /// that are not string-typed fail with [`ModelError::UnsupportedCoercion`].
    pub fn coerce_column(&self, name: &str, column: &Column) -> Result<Column> {
        let logical_type = self.logical_type(name)?;
        if !matches!(column.dtype(), DataType::String | DataType::Null) {
            return Err(ModelError::UnsupportedCoercion {
                field: name.to_string(),
                logical_type: logical_type.to_string(),
                reason: format!("expected a string column, found {}", column.dtype()),
            });
        }
        let as_string = column.cast(&DataType::String)?;
        let values = as_string.str()?;
        let column_name = column.name().clone();

        let coerced = match logical_type {
            LogicalType::Categorical | LogicalType::Checkbox => {
                let choices = self.choices(name)?;
                let decoded: Vec<Option<String>> = non_empty(values)
                    .map(|value| value.map(|raw| choices.decode(raw).to_string()))
                    .collect();
                Column::new(column_name, decoded)
            }
            LogicalType::Str | LogicalType::Calc => {
                let passed: Vec<Option<&str>> = non_empty(values).collect();
                Column::new(column_name, passed)
            }
            LogicalType::Float => {
                let parsed = non_empty(values)
                    .map(|value| value.map(|raw| parse_float(name, raw)).transpose())
                    .collect::<Result<Vec<Option<f64>>>>()?;
                Column::new(column_name, parsed)
            }
            LogicalType::Int => {
                let parsed = non_empty(values)
                    .map(|value| value.map(|raw| parse_int_prefix(name, raw)).transpose())
                    .collect::<Result<Vec<Option<i64>>>>()?;
                Column::new(column_name, parsed)
            }
            LogicalType::Date => {
                let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();
                let days = non_empty(values)
                    .map(|value| {
                        value
                            .map(|raw| parse_date(name, raw).map(|date| days_since(epoch, date)))
                            .transpose()
                    })
                    .collect::<Result<Vec<Option<i32>>>>()?;
                Column::new(column_name, days).cast(&DataType::Date)?
            }
        };
        Ok(coerced)
    }

    /// Coerces every column whose name is a known field; other columns are
    /// kept unchanged.
    pub fn coerce_frame(&self, frame: &DataFrame) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(frame.width());
        let mut skipped = 0usize;
        for column in frame.get_columns() {
            let name = column.name().as_str();
            if self.exists(name) {
                columns.push(self.coerce_column(name, column)?);
            } else {
                skipped += 1;
                columns.push(column.clone());
            }
        }
        debug!(
            columns = frame.width(),
            skipped, "coerced frame columns"
        );
        Ok(DataFrame::new(columns)?)
    }
}

/// Iterates a string column, mapping empty strings to `None`.
fn non_empty(values: &StringChunked) -> impl Iterator<Item = Option<&str>> {
    values
        .iter()
        .map(|value| value.filter(|raw| !raw.is_empty()))
}

fn days_since(epoch: NaiveDate, date: NaiveDate) -> i32 {
    date.signed_duration_since(epoch).num_days() as i32
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;

    use super::*;
    use crate::descriptor::FieldDescriptor;

    fn metadata() -> Metadata {
        Metadata::new(vec![
            FieldDescriptor::new("record_id", "text"),
            FieldDescriptor::new("weight", "text").with_validation("number"),
            FieldDescriptor::new("visit_date", "text").with_validation("date_ymd"),
            FieldDescriptor::new("sex", "radio").with_choices("1, Male | 2, Female"),
        ])
        .unwrap()
    }

    #[test]
    fn test_coerce_float_column() {
        let column = Column::new("weight".into(), ["70.5", "", "81"]);
        let coerced = metadata().coerce_column("weight", &column).unwrap();
        assert_eq!(coerced.dtype(), &DataType::Float64);
        let values = coerced.f64().unwrap();
        assert_eq!(values.get(0), Some(70.5));
        assert_eq!(values.get(1), None);
        assert_eq!(values.get(2), Some(81.0));
    }

    #[test]
    fn test_coerce_date_column() {
        let column = Column::new("visit_date".into(), ["1970-01-02", "2000/01/01", ""]);
        let coerced = metadata().coerce_column("visit_date", &column).unwrap();
        assert_eq!(coerced.dtype(), &DataType::Date);
        assert_eq!(coerced.null_count(), 1);
        let days = coerced.cast(&DataType::Int32).unwrap();
        assert_eq!(days.i32().unwrap().get(0), Some(1));
        assert_eq!(days.i32().unwrap().get(1), Some(10957));
    }

    #[test]
    fn test_coerce_choice_column_keeps_unmapped() {
        let column = Column::new("sex".into(), ["1", "2", "3"]);
        let coerced = metadata().coerce_column("sex", &column).unwrap();
        let labels = coerced.str().unwrap();
        assert_eq!(labels.get(0), Some("Male"));
        assert_eq!(labels.get(1), Some("Female"));
        assert_eq!(labels.get(2), Some("3"));
    }

    #[test]
    fn test_non_string_column_is_unsupported() {
        let column = Column::new("weight".into(), [1.0f64, 2.0]);
        let err = metadata().coerce_column("weight", &column).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedCoercion { .. }));
    }

    #[test]
    fn test_unknown_column_name_fails() {
        let column = Column::new("height".into(), ["1"]);
        let err = metadata().coerce_column("height", &column).unwrap_err();
        assert!(err.is_unknown_field());
    }

    #[test]
    fn test_coerce_frame_leaves_unknown_columns() {
        let df = df! {
            "record_id" => &["1", "2"],
            "weight" => &["60", "72.25"],
            "redcap_event_name" => &["baseline_arm_1", "baseline_arm_1"],
        }
        .unwrap();
        let coerced = metadata().coerce_frame(&df).unwrap();
        assert_eq!(coerced.column("weight").unwrap().dtype(), &DataType::Float64);
        assert_eq!(
            coerced.column("redcap_event_name").unwrap().dtype(),
            &DataType::String
        );
    }
}
