//! Derivation of logical types, choice sets and validation ranges from raw
//! descriptor attributes.

use crate::coerce::parse_date;
use crate::descriptor::{FieldDescriptor, FieldType};
use crate::error::{ModelError, Result};
use crate::types::{Choices, LogicalType, RangeValue, TypingPolicy, ValidRange};

/// Derives the logical type of a descriptor under the given policy.
///
/// Text fields are refined by their validation subtype: any subtype mentioning
/// `date` is a date, `number` is a float, `integer` is an int, and everything
/// else (including no validation) is a plain string. Under
/// [`TypingPolicy::Legacy`] every other raw type is categorical.
pub fn derive_logical_type(
    descriptor: &FieldDescriptor,
    policy: TypingPolicy,
) -> Result<LogicalType> {
    if policy == TypingPolicy::Legacy && descriptor.raw_type != FieldType::Text {
        return Ok(LogicalType::Categorical);
    }
    match &descriptor.raw_type {
        FieldType::Checkbox => Ok(LogicalType::Checkbox),
        FieldType::Text => Ok(text_logical_type(&descriptor.validation_subtype)),
        FieldType::Descriptive => Ok(LogicalType::Str),
        FieldType::Calc => Ok(LogicalType::Calc),
        FieldType::Radio | FieldType::Dropdown | FieldType::YesNo => Ok(LogicalType::Categorical),
        FieldType::Other(raw_type) => Err(ModelError::UnsupportedFieldType {
            field: descriptor.name.clone(),
            raw_type: raw_type.clone(),
        }),
    }
}

fn text_logical_type(validation_subtype: &str) -> LogicalType {
    match validation_subtype {
        "" => LogicalType::Str,
        subtype if subtype.contains("date") => LogicalType::Date,
        "number" => LogicalType::Float,
        "integer" => LogicalType::Int,
        _ => LogicalType::Str,
    }
}

/// Returns the choice set of a descriptor.
///
/// Yes/no and checkbox fields have fixed sets; every other field parses its
/// pipe-delimited `<integer>, <label>` specification.
pub fn parse_choices(descriptor: &FieldDescriptor) -> Result<Choices> {
    match descriptor.raw_type {
        FieldType::YesNo => return Ok(Choices::yes_no()),
        FieldType::Checkbox => return Ok(Choices::checked()),
        _ => {}
    }
    if descriptor.choices_spec.trim().is_empty() {
        return Err(ModelError::NoChoicesDefined {
            field: descriptor.name.clone(),
        });
    }

    let mut pairs = Vec::new();
    for entry in descriptor.choices_spec.split('|') {
        let malformed = || ModelError::MalformedChoices {
            field: descriptor.name.clone(),
            entry: entry.trim().to_string(),
        };
        let (code, label) = entry.split_once(',').ok_or_else(malformed)?;
        let code = code.trim();
        if !is_integer_code(code) {
            return Err(malformed());
        }
        pairs.push((code.to_string(), label.trim().to_string()));
    }
    Ok(Choices::from_pairs(pairs))
}

fn is_integer_code(code: &str) -> bool {
    let digits = code.strip_prefix('-').unwrap_or(code);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Parses the `min`/`max` bounds of a descriptor.
///
/// Returns `None` when both bounds are empty.
pub fn parse_valid_range(
    descriptor: &FieldDescriptor,
    logical_type: LogicalType,
) -> Result<Option<ValidRange>> {
    let min = parse_bound(descriptor, &descriptor.min, logical_type)?;
    let max = parse_bound(descriptor, &descriptor.max, logical_type)?;
    if min.is_none() && max.is_none() {
        return Ok(None);
    }
    Ok(Some(ValidRange { min, max }))
}

fn parse_bound(
    descriptor: &FieldDescriptor,
    raw: &str,
    logical_type: LogicalType,
) -> Result<Option<RangeValue>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let invalid = |expected: &'static str| ModelError::InvalidBound {
        field: descriptor.name.clone(),
        value: raw.to_string(),
        expected,
    };
    let value = match logical_type {
        LogicalType::Float => RangeValue::Float(raw.parse().map_err(|_| invalid("float"))?),
        LogicalType::Int => RangeValue::Int(raw.parse().map_err(|_| invalid("int"))?),
        LogicalType::Date => {
            RangeValue::Date(parse_date(&descriptor.name, raw).map_err(|_| invalid("date"))?)
        }
        _ => RangeValue::Text(raw.to_string()),
    };
    Ok(Some(value))
}
