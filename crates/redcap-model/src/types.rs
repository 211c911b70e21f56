//! Logical types, typed values and choice sets.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Semantic type of a field, derived from its raw type and validation.
///
/// Every coercion keys off this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Str,
    Float,
    Int,
    Date,
    Categorical,
    Checkbox,
    Calc,
}

impl LogicalType {
    /// Returns the lowercase name (`str`, `float`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Float => "float",
            Self::Int => "int",
            Self::Date => "date",
            Self::Categorical => "categorical",
            Self::Checkbox => "checkbox",
            Self::Calc => "calc",
        }
    }

    /// Returns true for types whose values decode through a choice set.
    #[must_use]
    pub const fn has_choices(&self) -> bool {
        matches!(self, Self::Categorical | Self::Checkbox)
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy mapping raw field types onto logical types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypingPolicy {
    /// Only the known raw types are accepted; anything else is an
    /// `UnsupportedFieldType` error.
    #[default]
    FixedVocabulary,
    /// Every raw type other than `text` is treated as categorical.
    Legacy,
}

/// A coerced field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

impl TypedValue {
    /// Serializes the value back into the raw API representation.
    ///
    /// Dates use `YYYY-MM-DD`; decoded choice labels stay labels.
    #[must_use]
    pub fn to_raw(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

/// One bound of a validation range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeValue {
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    /// Bound of a field whose logical type has no numeric or date parse.
    Text(String),
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Validation range of a field; at least one bound is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidRange {
    pub min: Option<RangeValue>,
    pub max: Option<RangeValue>,
}

impl ValidRange {
    /// Returns both bounds as a tuple.
    #[must_use]
    pub fn bounds(&self) -> (Option<&RangeValue>, Option<&RangeValue>) {
        (self.min.as_ref(), self.max.as_ref())
    }
}

/// A coded choice and its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub code: String,
    pub label: String,
}

/// Ordered set of coded choices of a categorical or checkbox field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choices {
    entries: Vec<Choice>,
}

impl Choices {
    /// Builds a choice set from `(code, label)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(code, label)| Choice {
                    code: code.into(),
                    label: label.into(),
                })
                .collect(),
        }
    }

    /// The fixed `0: No`, `1: Yes` set of yes/no fields.
    #[must_use]
    pub fn yes_no() -> Self {
        Self::from_pairs([("0", "No"), ("1", "Yes")])
    }

    /// The fixed `0: Unchecked`, `1: Checked` set of checkbox sub-fields.
    #[must_use]
    pub fn checked() -> Self {
        Self::from_pairs([("0", "Unchecked"), ("1", "Checked")])
    }

    /// Returns the label for a raw code.
    #[must_use]
    pub fn label(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|choice| choice.code == code)
            .map(|choice| choice.label.as_str())
    }

    /// Returns the label for a raw code, or the code itself when unmapped.
    #[must_use]
    pub fn decode<'a>(&'a self, code: &'a str) -> &'a str {
        self.label(code).unwrap_or(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Choice> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
