//! Scalar coercion of raw API strings into typed values.

use chrono::NaiveDate;

use crate::error::{ModelError, Result};
use crate::types::{Choices, LogicalType, TypedValue};

/// Accepted date layouts, tried in order.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses a date using the first matching entry of [`DATE_FORMATS`].
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| ModelError::DateParse {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

/// Parses the first run of decimal digits in `raw` as an integer.
///
/// Trailing unit text is ignored (`"45 yrs"` is 45). This differs from a bare
/// digit-run match in one case: a minus sign directly in front of the digits
/// is kept, so `"-5 kg"` is -5 rather than 5. A separated sign (`"- 5"`) is
/// not.
pub fn parse_int_prefix(field: &str, raw: &str) -> Result<i64> {
    let failed = || ModelError::CoercionFailed {
        field: field.to_string(),
        value: raw.to_string(),
        expected: "int",
    };
    let start = raw.find(|c: char| c.is_ascii_digit()).ok_or_else(failed)?;
    let digits_len = raw[start..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len() - start);
    let negative = raw[..start].ends_with('-');
    let digits = &raw[start..start + digits_len];
    let magnitude: i64 = digits.parse().map_err(|_| failed())?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Parses a decimal number.
pub fn parse_float(field: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse()
        .map_err(|_| ModelError::CoercionFailed {
            field: field.to_string(),
            value: raw.to_string(),
            expected: "float",
        })
}

/// Coerces one raw value according to its logical type.
///
/// Empty strings have no value. Categorical and checkbox values decode through
/// `choices`, falling back to the raw code when it is unmapped.
pub fn coerce_value(
    field: &str,
    logical_type: LogicalType,
    choices: Option<&Choices>,
    raw: &str,
) -> Result<Option<TypedValue>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let value = match logical_type {
        LogicalType::Categorical | LogicalType::Checkbox => {
            let decoded = choices.map_or(raw, |choices| choices.decode(raw));
            TypedValue::Text(decoded.to_string())
        }
        LogicalType::Str | LogicalType::Calc => TypedValue::Text(raw.to_string()),
        LogicalType::Float => TypedValue::Float(parse_float(field, raw)?),
        LogicalType::Int => TypedValue::Int(parse_int_prefix(field, raw)?),
        LogicalType::Date => TypedValue::Date(parse_date(field, raw)?),
    };
    Ok(Some(value))
}
