//! Payload validation against a schema snapshot
//!
//! Validation semantics:
//! - Top-level payload must be a JSON object, else one `InvalidPayloadShape`
//! - Every required field must be present
//! - Keys without a field definition are `UnknownField` (strict) or dropped (lenient)
//! - Types match exactly: no numeric strings, no nulls, no float-for-integer
//! - Length, range, pattern and enum constraints are checked after the type
//! - All violations are collected, not just the first
//!
//! Accepted payloads are normalized: only known fields, in declaration order.
//! Validation is pure; nothing here touches storage.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::{json_type_name, FieldType, Schema, TypeKind};

/// Path used for violations on the payload itself
pub const ROOT_PATH: &str = "$root";

/// How keys without a field definition are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Unknown keys are violations
    #[default]
    Strict,
    /// Unknown keys are silently dropped
    Lenient,
}

/// Why a field failed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason")]
pub enum ViolationReason {
    MissingRequiredField,
    UnknownField,
    InvalidPayloadShape { actual: String },
    TypeMismatch { expected: String, actual: String },
    NotInEnum { value: String, allowed: Vec<String> },
    BelowMinimum { minimum: Value },
    AboveMaximum { maximum: Value },
    TooShort { min_length: usize, length: usize },
    TooLong { max_length: usize, length: usize },
    PatternMismatch { pattern: String },
}

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Field path, e.g. `age`, `tags[2]` or `$root`
    pub field: String,
    #[serde(flatten)]
    pub reason: ViolationReason,
}

impl Violation {
    pub fn new(field: impl Into<String>, reason: ViolationReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, ViolationReason::MissingRequiredField)
    }

    pub fn unknown(field: impl Into<String>) -> Self {
        Self::new(field, ViolationReason::UnknownField)
    }

    fn type_mismatch(field: impl Into<String>, expected: &str, actual: &Value) -> Self {
        Self::new(
            field,
            ViolationReason::TypeMismatch {
                expected: expected.to_string(),
                actual: json_type_name(actual).to_string(),
            },
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': ", self.field)?;
        match &self.reason {
            ViolationReason::MissingRequiredField => write!(f, "required field is missing"),
            ViolationReason::UnknownField => write!(f, "field is not declared in the schema"),
            ViolationReason::InvalidPayloadShape { actual } => {
                write!(f, "payload must be an object, got {}", actual)
            }
            ViolationReason::TypeMismatch { expected, actual } => {
                write!(f, "expected {}, got {}", expected, actual)
            }
            ViolationReason::NotInEnum { value, allowed } => {
                write!(f, "'{}' is not one of [{}]", value, allowed.join(", "))
            }
            ViolationReason::BelowMinimum { minimum } => write!(f, "below minimum {}", minimum),
            ViolationReason::AboveMaximum { maximum } => write!(f, "above maximum {}", maximum),
            ViolationReason::TooShort { min_length, length } => {
                write!(f, "length {} is shorter than {}", length, min_length)
            }
            ViolationReason::TooLong { max_length, length } => {
                write!(f, "length {} is longer than {}", length, max_length)
            }
            ViolationReason::PatternMismatch { pattern } => {
                write!(f, "does not match pattern '{}'", pattern)
            }
        }
    }
}

/// Outcome of a validation. `Rejected` is a normal result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Normalized payload
    Accepted(Map<String, Value>),
    /// Every violation found, in detection order
    Rejected(Vec<Violation>),
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationResult::Accepted(_))
    }

    /// Violations, empty when accepted
    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationResult::Accepted(_) => &[],
            ValidationResult::Rejected(v) => v,
        }
    }

    pub fn into_result(self) -> Result<Map<String, Value>, Vec<Violation>> {
        match self {
            ValidationResult::Accepted(data) => Ok(data),
            ValidationResult::Rejected(violations) => Err(violations),
        }
    }
}

/// Validates untyped payloads against schema snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator {
    mode: ValidationMode,
}

impl SchemaValidator {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn strict() -> Self {
        Self::new(ValidationMode::Strict)
    }

    pub fn lenient() -> Self {
        Self::new(ValidationMode::Lenient)
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Validates a payload against a schema.
    pub fn validate(&self, schema: &Schema, payload: &Value) -> ValidationResult {
        let Some(obj) = payload.as_object() else {
            return ValidationResult::Rejected(vec![Violation::new(
                ROOT_PATH,
                ViolationReason::InvalidPayloadShape {
                    actual: json_type_name(payload).to_string(),
                },
            )]);
        };

        let mut violations = Vec::new();

        for field in schema.fields.iter().filter(|f| f.required) {
            if !obj.contains_key(&field.name) {
                violations.push(Violation::missing(&field.name));
            }
        }

        for (key, value) in obj {
            match schema.field(key) {
                Some(def) => check_value(&def.field_type, key, value, &mut violations),
                None if self.mode == ValidationMode::Strict => {
                    violations.push(Violation::unknown(key))
                }
                None => {}
            }
        }

        if !violations.is_empty() {
            return ValidationResult::Rejected(violations);
        }

        let mut normalized = Map::new();
        for field in &schema.fields {
            if let Some(value) = obj.get(&field.name) {
                normalized.insert(field.name.clone(), value.clone());
            }
        }
        ValidationResult::Accepted(normalized)
    }

    /// Merges `patch` over a stored payload and validates the result.
    ///
    /// Only stored keys the current schema still declares are carried over;
    /// keys in `patch` are checked like any payload key.
    pub fn validate_patch(
        &self,
        schema: &Schema,
        existing: &Map<String, Value>,
        patch: &Value,
    ) -> ValidationResult {
        let Some(patch) = patch.as_object() else {
            return self.validate(schema, patch);
        };

        let mut merged: Map<String, Value> = existing
            .iter()
            .filter(|(k, _)| schema.contains_field(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (k, v) in patch {
            merged.insert(k.clone(), v.clone());
        }
        self.validate(schema, &Value::Object(merged))
    }
}

/// Checks one value against a field type, appending any violations.
fn check_value(field_type: &FieldType, path: &str, value: &Value, out: &mut Vec<Violation>) {
    match field_type {
        FieldType::String(c) => {
            let Some(s) = value.as_str() else {
                out.push(Violation::type_mismatch(path, "string", value));
                return;
            };
            let length = s.chars().count();
            if let Some(min_length) = c.min_length {
                if length < min_length {
                    out.push(Violation::new(path, ViolationReason::TooShort { min_length, length }));
                }
            }
            if let Some(max_length) = c.max_length {
                if length > max_length {
                    out.push(Violation::new(path, ViolationReason::TooLong { max_length, length }));
                }
            }
            if let Some(pattern) = &c.pattern {
                if !pattern.is_match(s) {
                    out.push(Violation::new(
                        path,
                        ViolationReason::PatternMismatch {
                            pattern: pattern.as_str().to_string(),
                        },
                    ));
                }
            }
        }
        FieldType::Integer(bounds) => {
            let Some(n) = integer_value(value) else {
                out.push(Violation::type_mismatch(path, "integer", value));
                return;
            };
            if let Some(minimum) = bounds.minimum {
                if n < i128::from(minimum) {
                    out.push(Violation::new(
                        path,
                        ViolationReason::BelowMinimum {
                            minimum: Value::from(minimum),
                        },
                    ));
                }
            }
            if let Some(maximum) = bounds.maximum {
                if n > i128::from(maximum) {
                    out.push(Violation::new(
                        path,
                        ViolationReason::AboveMaximum {
                            maximum: Value::from(maximum),
                        },
                    ));
                }
            }
        }
        FieldType::Number(bounds) => {
            let Some(n) = value.as_f64() else {
                out.push(Violation::type_mismatch(path, "number", value));
                return;
            };
            if let Some(minimum) = bounds.minimum {
                if n < minimum {
                    out.push(Violation::new(
                        path,
                        ViolationReason::BelowMinimum {
                            minimum: Value::from(minimum),
                        },
                    ));
                }
            }
            if let Some(maximum) = bounds.maximum {
                if n > maximum {
                    out.push(Violation::new(
                        path,
                        ViolationReason::AboveMaximum {
                            maximum: Value::from(maximum),
                        },
                    ));
                }
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                out.push(Violation::type_mismatch(path, "boolean", value));
            }
        }
        FieldType::Object => {
            if !value.is_object() {
                out.push(Violation::type_mismatch(path, "object", value));
            }
        }
        FieldType::Array { item_type } => {
            let Some(items) = value.as_array() else {
                out.push(Violation::type_mismatch(path, "array", value));
                return;
            };
            for (i, item) in items.iter().enumerate() {
                if !matches_kind(*item_type, item) {
                    out.push(Violation::type_mismatch(
                        format!("{}[{}]", path, i),
                        item_type.name(),
                        item,
                    ));
                }
            }
        }
        FieldType::Enum { values } => {
            let member = value
                .as_str()
                .map(|s| values.iter().any(|v| v == s))
                .unwrap_or(false);
            if !member {
                let rendered = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                out.push(Violation::new(
                    path,
                    ViolationReason::NotInEnum {
                        value: rendered,
                        allowed: values.clone(),
                    },
                ));
            }
        }
    }
}

/// Exact runtime-type check for unconstrained kinds (array items).
pub(crate) fn matches_kind(kind: TypeKind, value: &Value) -> bool {
    match kind {
        TypeKind::String => value.is_string(),
        TypeKind::Integer => integer_value(value).is_some(),
        TypeKind::Number => value.is_number(),
        TypeKind::Boolean => value.is_boolean(),
        TypeKind::Object => value.is_object(),
        TypeKind::Array => value.is_array(),
        TypeKind::Enum => value.is_string(),
    }
}

/// Integer view of a JSON number; floats (even `1.0`) are not integers.
pub(crate) fn integer_value(value: &Value) -> Option<i128> {
    value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from))
}
