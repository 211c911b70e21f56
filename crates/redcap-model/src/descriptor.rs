//! Field descriptors as exported by the REDCap metadata endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker in `field_annotation` that hides a field from data entry.
pub const HIDDEN_MARKER: &str = "@HIDDEN";

/// Separator between a checkbox field name and its choice key.
pub const CHECKBOX_SEPARATOR: &str = "___";

/// Raw `field_type` tag of a descriptor.
///
/// Tags outside the known vocabulary are kept verbatim in [`FieldType::Other`]
/// so that type derivation can name them in its error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Checkbox,
    Radio,
    Dropdown,
    YesNo,
    Descriptive,
    Calc,
    Other(String),
}

impl FieldType {
    /// Returns the tag as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Dropdown => "dropdown",
            Self::YesNo => "yesno",
            Self::Descriptive => "descriptive",
            Self::Calc => "calc",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "text" => Self::Text,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "dropdown" => Self::Dropdown,
            "yesno" => Self::YesNo,
            "descriptive" => Self::Descriptive,
            "calc" => Self::Calc,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for FieldType {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the project data dictionary.
///
/// All attributes are kept as the raw strings the API returns; parsing happens
/// in the [`Metadata`](crate::Metadata) accessors. Missing keys decode to empty
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Unique variable name.
    #[serde(rename = "field_name")]
    pub name: String,
    /// Instrument the field belongs to.
    #[serde(rename = "form_name", default)]
    pub form: String,
    #[serde(rename = "field_label", default)]
    pub label: String,
    #[serde(rename = "field_type")]
    pub raw_type: FieldType,
    /// Validation hint for text fields (`date_ymd`, `number`, `integer`, ...).
    #[serde(rename = "text_validation_type_or_show_slider_number", default)]
    pub validation_subtype: String,
    #[serde(rename = "text_validation_min", default)]
    pub min: String,
    #[serde(rename = "text_validation_max", default)]
    pub max: String,
    #[serde(rename = "required_field", default)]
    pub required: String,
    /// Pipe-delimited `key, label` pairs, or the formula of a calc field.
    #[serde(rename = "select_choices_or_calculations", default)]
    pub choices_spec: String,
    #[serde(default)]
    pub branching_logic: String,
    #[serde(rename = "field_annotation", default)]
    pub annotation: String,
}

impl FieldDescriptor {
    /// Creates a descriptor with the given name and raw type; every other
    /// attribute is empty.
    pub fn new(name: impl Into<String>, raw_type: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            form: String::new(),
            label: String::new(),
            raw_type: raw_type.into(),
            validation_subtype: String::new(),
            min: String::new(),
            max: String::new(),
            required: String::new(),
            choices_spec: String::new(),
            branching_logic: String::new(),
            annotation: String::new(),
        }
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the instrument name.
    #[must_use]
    pub fn with_form(mut self, form: impl Into<String>) -> Self {
        self.form = form.into();
        self
    }

    /// Sets the text validation subtype.
    #[must_use]
    pub fn with_validation(mut self, subtype: impl Into<String>) -> Self {
        self.validation_subtype = subtype.into();
        self
    }

    /// Sets the raw `min`/`max` bounds.
    #[must_use]
    pub fn with_range(mut self, min: impl Into<String>, max: impl Into<String>) -> Self {
        self.min = min.into();
        self.max = max.into();
        self
    }

    /// Sets the raw required flag.
    #[must_use]
    pub fn with_required(mut self, required: impl Into<String>) -> Self {
        self.required = required.into();
        self
    }

    /// Sets the raw choices specification.
    #[must_use]
    pub fn with_choices(mut self, choices_spec: impl Into<String>) -> Self {
        self.choices_spec = choices_spec.into();
        self
    }

    /// Sets the branching logic expression.
    #[must_use]
    pub fn with_branching_logic(mut self, logic: impl Into<String>) -> Self {
        self.branching_logic = logic.into();
        self
    }

    /// Sets the field annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    /// Names of the binary sub-fields a checkbox expands into, in choice order.
    ///
    /// Hyphens in choice keys become underscores, matching the export column
    /// names. Returns an empty list for non-checkbox fields.
    #[must_use]
    pub fn checkbox_fields(&self) -> Vec<String> {
        if self.raw_type != FieldType::Checkbox || self.choices_spec.trim().is_empty() {
            return Vec::new();
        }
        self.choices_spec
            .split('|')
            .map(|entry| {
                let key = entry.split(',').next().unwrap_or_default().trim();
                format!(
                    "{}{CHECKBOX_SEPARATOR}{}",
                    self.name,
                    key.replace('-', "_")
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_round_trip_tags() {
        assert_eq!(FieldType::from("yesno"), FieldType::YesNo);
        assert_eq!(FieldType::from("notes"), FieldType::Other("notes".into()));
        assert_eq!(FieldType::Other("file".into()).to_string(), "file");
    }

    #[test]
    fn test_checkbox_fields_normalize_hyphens() {
        let field = FieldDescriptor::new("symptoms", "checkbox")
            .with_choices("1, Fever | -1, Unknown | 2 , Cough");
        assert_eq!(
            field.checkbox_fields(),
            vec!["symptoms___1", "symptoms____1", "symptoms___2"]
        );
    }

    #[test]
    fn test_checkbox_fields_empty_for_other_types() {
        let field = FieldDescriptor::new("sex", "radio").with_choices("1, Male | 2, Female");
        assert!(field.checkbox_fields().is_empty());
    }

    #[test]
    fn test_deserialize_with_missing_keys() {
        let json = r#"{"field_name": "age", "field_type": "text", "field_label": "Age"}"#;
        let field: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(field.name, "age");
        assert_eq!(field.raw_type, FieldType::Text);
        assert_eq!(field.label, "Age");
        assert!(field.min.is_empty());
        assert!(field.annotation.is_empty());
    }
}
