//! REDCap project metadata model.
//!
//! This crate turns the data dictionary exported by a REDCap project into a
//! typed decoder for the schema-less string values the record export returns.
//!
//! # Features
//!
//! - **Metadata index**: expanded (checkbox sub-field) and raw field listings
//!   with lookups that fail explicitly on unknown names
//! - **Logical types**: `str | float | int | date | categorical | checkbox | calc`,
//!   derived under a selectable [`TypingPolicy`]
//! - **Accessors**: labels, choice sets, validation ranges, required and hidden
//!   flags, branching logic
//! - **Coercion**: single rows into [`TypedRow`]s and whole polars columns into
//!   typed columns
//!
//! # Example
//!
//! ```
//! use redcap_model::{FieldDescriptor, LogicalType, Metadata, RawRow, TypedValue};
//!
//! let metadata = Metadata::new(vec![
//!     FieldDescriptor::new("age", "text")
//!         .with_validation("integer")
//!         .with_range("0", "120"),
//! ])?;
//! assert_eq!(metadata.logical_type("age")?, LogicalType::Int);
//!
//! let row = RawRow::from([("age".to_string(), "45 yrs".to_string())]);
//! let typed = metadata.coerce_row(&row)?;
//! assert_eq!(typed["age"], Some(TypedValue::Int(45)));
//! # Ok::<(), redcap_model::ModelError>(())
//! ```

mod coerce;
mod column;
mod descriptor;
mod error;
mod metadata;
mod types;
mod typing;

// === Error Types ===
pub use error::{ModelError, Result};

// === Descriptors ===
pub use descriptor::{CHECKBOX_SEPARATOR, FieldDescriptor, FieldType, HIDDEN_MARKER};

// === Metadata Index ===
pub use metadata::{Metadata, RawRow, TypedRow};

// === Types ===
pub use types::{
    Choice, Choices, LogicalType, RangeValue, TypedValue, TypingPolicy, ValidRange,
};

// === Type Derivation & Coercion ===
pub use coerce::{DATE_FORMATS, coerce_value, parse_date, parse_float, parse_int_prefix};
pub use typing::{derive_logical_type, parse_choices, parse_valid_range};
