//! The project metadata index.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::coerce::coerce_value;
use crate::descriptor::{FieldDescriptor, FieldType, HIDDEN_MARKER};
use crate::error::{ModelError, Result};
use crate::types::{Choices, LogicalType, TypedValue, TypingPolicy, ValidRange};
use crate::typing::{derive_logical_type, parse_choices, parse_valid_range};

/// A record as returned by the export endpoint: field name to raw value, in
/// response order.
pub type RawRow = IndexMap<String, String>;

/// A coerced record; `None` marks an empty value.
pub type TypedRow = IndexMap<String, Option<TypedValue>>;

/// Immutable index over a project's data dictionary.
///
/// Every checkbox descriptor expands into one `{name}___{code}` sub-field per
/// choice. Accessors accept expanded names and raw names alike; any other name
/// fails with [`ModelError::UnknownField`].
#[derive(Debug, Clone)]
pub struct Metadata {
    descriptors: Vec<FieldDescriptor>,
    raw_fields: Vec<String>,
    expanded_fields: Vec<String>,
    /// Expanded field name to descriptor position.
    expanded_index: HashMap<String, usize>,
    /// Raw field name to descriptor position.
    raw_index: HashMap<String, usize>,
    policy: TypingPolicy,
}

impl Metadata {
    /// Builds the index from the descriptors of a metadata document.
    ///
    /// Fails with [`ModelError::DuplicateField`] when a name occurs twice,
    /// either directly or through checkbox expansion.
    pub fn new(descriptors: Vec<FieldDescriptor>) -> Result<Self> {
        let mut raw_fields = Vec::with_capacity(descriptors.len());
        let mut expanded_fields = Vec::with_capacity(descriptors.len());
        let mut expanded_index = HashMap::with_capacity(descriptors.len());
        let mut raw_index = HashMap::with_capacity(descriptors.len());

        for (position, descriptor) in descriptors.iter().enumerate() {
            if raw_index.insert(descriptor.name.clone(), position).is_some() {
                return Err(ModelError::DuplicateField {
                    field: descriptor.name.clone(),
                });
            }
            raw_fields.push(descriptor.name.clone());

            let expanded = if descriptor.raw_type == FieldType::Checkbox {
                descriptor.checkbox_fields()
            } else {
                vec![descriptor.name.clone()]
            };
            for name in expanded {
                if expanded_index.insert(name.clone(), position).is_some() {
                    return Err(ModelError::DuplicateField { field: name });
                }
                expanded_fields.push(name);
            }
        }

        debug!(
            raw = raw_fields.len(),
            expanded = expanded_fields.len(),
            "built metadata index"
        );

        Ok(Self {
            descriptors,
            raw_fields,
            expanded_fields,
            expanded_index,
            raw_index,
            policy: TypingPolicy::default(),
        })
    }

    /// Selects the type derivation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: TypingPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> TypingPolicy {
        self.policy
    }

    /// All descriptors in document order.
    #[must_use]
    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    /// One name per descriptor, in document order.
    #[must_use]
    pub fn raw_fields(&self) -> &[String] {
        &self.raw_fields
    }

    /// Field names with checkbox descriptors replaced by their sub-fields.
    #[must_use]
    pub fn expanded_fields(&self) -> &[String] {
        &self.expanded_fields
    }

    /// Returns expanded or raw field names.
    #[must_use]
    pub fn variables(&self, expand_checkbox: bool) -> &[String] {
        if expand_checkbox {
            &self.expanded_fields
        } else {
            &self.raw_fields
        }
    }

    /// Expanded field names, excluding descriptive (display-only) fields.
    #[must_use]
    pub fn variables_without_descriptive(&self) -> Vec<&str> {
        self.expanded_fields
            .iter()
            .filter(|name| {
                self.expanded_index
                    .get(name.as_str())
                    .is_some_and(|&position| {
                        self.descriptors[position].raw_type != FieldType::Descriptive
                    })
            })
            .map(String::as_str)
            .collect()
    }

    /// Returns true if `name` is an expanded or raw field name.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.expanded_index.contains_key(name) || self.raw_index.contains_key(name)
    }

    /// Returns the descriptor owning `name`.
    pub fn descriptor(&self, name: &str) -> Result<&FieldDescriptor> {
        self.expanded_index
            .get(name)
            .or_else(|| self.raw_index.get(name))
            .map(|&position| &self.descriptors[position])
            .ok_or_else(|| ModelError::UnknownField {
                field: name.to_string(),
            })
    }

    pub fn label(&self, name: &str) -> Result<&str> {
        Ok(&self.descriptor(name)?.label)
    }

    /// Returns the logical type of a field under the active policy.
    pub fn logical_type(&self, name: &str) -> Result<LogicalType> {
        derive_logical_type(self.descriptor(name)?, self.policy)
    }

    /// Returns the parsed validation range, or `None` if both bounds are empty.
    pub fn valid_range(&self, name: &str) -> Result<Option<ValidRange>> {
        let descriptor = self.descriptor(name)?;
        let logical_type = derive_logical_type(descriptor, self.policy)?;
        parse_valid_range(descriptor, logical_type)
    }

    /// A field is required when its raw flag is non-empty.
    pub fn is_required(&self, name: &str) -> Result<bool> {
        Ok(!self.descriptor(name)?.required.is_empty())
    }

    /// A field is hidden when its annotation carries the `@HIDDEN` marker.
    pub fn is_hidden(&self, name: &str) -> Result<bool> {
        Ok(self.descriptor(name)?.annotation.contains(HIDDEN_MARKER))
    }

    /// Returns the raw branching logic expression, unevaluated.
    pub fn branching_logic(&self, name: &str) -> Result<Option<&str>> {
        let logic = self.descriptor(name)?.branching_logic.as_str();
        Ok((!logic.is_empty()).then_some(logic))
    }

    /// Returns the choice set of a field.
    pub fn choices(&self, name: &str) -> Result<Choices> {
        parse_choices(self.descriptor(name)?)
    }

    /// Coerces a single raw value of field `name`.
    pub fn coerce_value(&self, name: &str, raw: &str) -> Result<Option<TypedValue>> {
        if raw.is_empty() {
            self.descriptor(name)?;
            return Ok(None);
        }
        let logical_type = self.logical_type(name)?;
        let choices = if logical_type.has_choices() {
            Some(self.choices(name)?)
        } else {
            None
        };
        coerce_value(name, logical_type, choices.as_ref(), raw)
    }

    /// Coerces every field of a record.
    ///
    /// Fails on the first unknown field or unparseable value.
    pub fn coerce_row(&self, row: &RawRow) -> Result<TypedRow> {
        row.iter()
            .map(|(name, raw)| Ok::<_, ModelError>((name.clone(), self.coerce_value(name, raw)?)))
            .collect()
    }
}
