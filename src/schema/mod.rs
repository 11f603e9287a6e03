//! Schema subsystem for dynschema
//!
//! Schemas are runtime-defined and checked at definition time. Records are
//! validated against a schema snapshot before they reach the store.
//!
//! # Design Principles
//!
//! - Closed type vocabulary with per-type constraints
//! - Field names unique within a schema, declaration order preserved
//! - No nulls, defaults, or coercion during validation
//! - Readers see whole schema versions only

mod errors;
mod registry;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult};
pub use registry::SchemaRegistry;
pub use types::{
    json_type_name, Bounds, FieldDefinition, FieldSpec, FieldType, Pattern, Schema, SchemaId,
    StringConstraints, TypeKind,
};
pub use validator::{
    SchemaValidator, ValidationMode, ValidationResult, Violation, ViolationReason, ROOT_PATH,
};

pub(crate) use validator::{integer_value, matches_kind};
