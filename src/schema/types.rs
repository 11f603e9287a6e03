//! Field and schema type definitions
//!
//! Supported field types form a closed vocabulary:
//! - string: UTF-8 string, optional `minLength` / `maxLength` / `pattern`
//! - integer: 64-bit integer, optional `minimum` / `maximum`
//! - number: any JSON number, optional `minimum` / `maximum`
//! - boolean
//! - object: any JSON mapping (no nested field schema)
//! - array: ordered sequence whose items share one `itemType`
//! - enum: one of a declared set of string `values`
//!
//! Field definitions arrive as loosely typed [`FieldSpec`]s and are checked
//! into [`FieldDefinition`]s. A constraint that does not fit the declared type
//! is rejected here, at definition time, never during payload validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::SchemaError;

/// Schema identifier, allocated by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(pub u64);

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The bare type tag of a field, without constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Enum,
}

impl TypeKind {
    /// Returns the type name used on the wire and in error messages
    pub fn name(&self) -> &'static str {
        match self {
            TypeKind::String => "string",
            TypeKind::Integer => "integer",
            TypeKind::Number => "number",
            TypeKind::Boolean => "boolean",
            TypeKind::Object => "object",
            TypeKind::Array => "array",
            TypeKind::Enum => "enum",
        }
    }

    /// Whether this kind may be used as an array `itemType`
    pub fn is_item_kind(&self) -> bool {
        !matches!(self, TypeKind::Array | TypeKind::Enum)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TypeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(TypeKind::String),
            "integer" => Ok(TypeKind::Integer),
            "number" => Ok(TypeKind::Number),
            "boolean" => Ok(TypeKind::Boolean),
            "object" => Ok(TypeKind::Object),
            "array" => Ok(TypeKind::Array),
            "enum" => Ok(TypeKind::Enum),
            other => Err(format!(
                "unknown type '{}', must be one of string, integer, number, boolean, object, array, enum",
                other
            )),
        }
    }
}

/// A compiled `pattern` constraint. Compares by source text.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a pattern, failing on invalid regex syntax
    pub fn new(source: impl Into<String>) -> Result<Self, String> {
        let source = source.into();
        let regex = Regex::new(&source).map_err(|e| format!("invalid pattern: {}", e))?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Unanchored search, as JSON-Schema style patterns behave
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Length and pattern constraints for string fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringConstraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
}

/// Inclusive range constraints for numeric fields
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds<T> {
    pub minimum: Option<T>,
    pub maximum: Option<T>,
}

/// Field type together with its type-specific constraints.
///
/// Constraints live inside the variant they belong to, so a checked
/// definition can never carry a constraint its type does not support.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String(StringConstraints),
    Integer(Bounds<i64>),
    Number(Bounds<f64>),
    Boolean,
    Object,
    Array { item_type: TypeKind },
    Enum { values: Vec<String> },
}

impl FieldType {
    /// Returns the bare type tag
    pub fn kind(&self) -> TypeKind {
        match self {
            FieldType::String(_) => TypeKind::String,
            FieldType::Integer(_) => TypeKind::Integer,
            FieldType::Number(_) => TypeKind::Number,
            FieldType::Boolean => TypeKind::Boolean,
            FieldType::Object => TypeKind::Object,
            FieldType::Array { .. } => TypeKind::Array,
            FieldType::Enum { .. } => TypeKind::Enum,
        }
    }

    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Unconstrained string type
    pub fn string() -> Self {
        FieldType::String(StringConstraints::default())
    }

    /// Unconstrained integer type
    pub fn integer() -> Self {
        FieldType::Integer(Bounds::default())
    }

    /// Unconstrained number type
    pub fn number() -> Self {
        FieldType::Number(Bounds::default())
    }

    /// Array of the given item kind
    pub fn array_of(item_type: TypeKind) -> Self {
        FieldType::Array { item_type }
    }

    /// Enum over the given values
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a type tag plus raw constraints into a checked field type
    fn parse(kind: TypeKind, constraints: &Map<String, Value>) -> Result<Self, String> {
        let allowed: &[&str] = match kind {
            TypeKind::String => &["minLength", "maxLength", "pattern"],
            TypeKind::Integer | TypeKind::Number => &["minimum", "maximum"],
            TypeKind::Boolean | TypeKind::Object => &[],
            TypeKind::Array => &["itemType"],
            TypeKind::Enum => &["values"],
        };
        if let Some(key) = constraints.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(format!(
                "constraint '{}' is not valid for type '{}'",
                key, kind
            ));
        }

        match kind {
            TypeKind::String => {
                let min_length = usize_constraint(constraints, "minLength")?;
                let max_length = usize_constraint(constraints, "maxLength")?;
                if let (Some(min), Some(max)) = (min_length, max_length) {
                    if min > max {
                        return Err(format!("minLength {} exceeds maxLength {}", min, max));
                    }
                }
                let pattern = match constraints.get("pattern") {
                    None => None,
                    Some(Value::String(source)) => Some(Pattern::new(source.as_str())?),
                    Some(other) => {
                        return Err(format!("pattern must be a string, got {}", json_type_name(other)))
                    }
                };
                Ok(FieldType::String(StringConstraints {
                    min_length,
                    max_length,
                    pattern,
                }))
            }
            TypeKind::Integer => {
                let bounds = Bounds {
                    minimum: i64_constraint(constraints, "minimum")?,
                    maximum: i64_constraint(constraints, "maximum")?,
                };
                if let (Some(min), Some(max)) = (bounds.minimum, bounds.maximum) {
                    if min > max {
                        return Err(format!("minimum {} exceeds maximum {}", min, max));
                    }
                }
                Ok(FieldType::Integer(bounds))
            }
            TypeKind::Number => {
                let bounds = Bounds {
                    minimum: f64_constraint(constraints, "minimum")?,
                    maximum: f64_constraint(constraints, "maximum")?,
                };
                if let (Some(min), Some(max)) = (bounds.minimum, bounds.maximum) {
                    if min > max {
                        return Err(format!("minimum {} exceeds maximum {}", min, max));
                    }
                }
                Ok(FieldType::Number(bounds))
            }
            TypeKind::Boolean => Ok(FieldType::Boolean),
            TypeKind::Object => Ok(FieldType::Object),
            TypeKind::Array => {
                let item = match constraints.get("itemType") {
                    Some(Value::String(name)) => name.parse::<TypeKind>()?,
                    Some(other) => {
                        return Err(format!(
                            "itemType must be a type name, got {}",
                            json_type_name(other)
                        ))
                    }
                    None => return Err("array fields require an 'itemType' constraint".into()),
                };
                if !item.is_item_kind() {
                    return Err(format!("'{}' cannot be used as an array itemType", item));
                }
                Ok(FieldType::Array { item_type: item })
            }
            TypeKind::Enum => {
                let raw = match constraints.get("values") {
                    Some(Value::Array(raw)) => raw,
                    Some(other) => {
                        return Err(format!("values must be an array, got {}", json_type_name(other)))
                    }
                    None => return Err("enum fields require a 'values' constraint".into()),
                };
                if raw.is_empty() {
                    return Err("enum values must not be empty".into());
                }
                let mut values: Vec<String> = Vec::with_capacity(raw.len());
                for v in raw {
                    let s = v
                        .as_str()
                        .ok_or_else(|| format!("enum values must be strings, got {}", json_type_name(v)))?;
                    if values.iter().any(|existing| existing == s) {
                        return Err(format!("duplicate enum value '{}'", s));
                    }
                    values.push(s.to_string());
                }
                Ok(FieldType::Enum { values })
            }
        }
    }

    /// Rebuilds the raw constraint mapping for this type
    fn constraints(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            FieldType::String(c) => {
                if let Some(min) = c.min_length {
                    map.insert("minLength".into(), Value::from(min));
                }
                if let Some(max) = c.max_length {
                    map.insert("maxLength".into(), Value::from(max));
                }
                if let Some(pattern) = &c.pattern {
                    map.insert("pattern".into(), Value::from(pattern.as_str()));
                }
            }
            FieldType::Integer(b) => {
                if let Some(min) = b.minimum {
                    map.insert("minimum".into(), Value::from(min));
                }
                if let Some(max) = b.maximum {
                    map.insert("maximum".into(), Value::from(max));
                }
            }
            FieldType::Number(b) => {
                if let Some(min) = b.minimum {
                    map.insert("minimum".into(), Value::from(min));
                }
                if let Some(max) = b.maximum {
                    map.insert("maximum".into(), Value::from(max));
                }
            }
            FieldType::Boolean | FieldType::Object => {}
            FieldType::Array { item_type } => {
                map.insert("itemType".into(), Value::from(item_type.name()));
            }
            FieldType::Enum { values } => {
                map.insert(
                    "values".into(),
                    Value::Array(values.iter().cloned().map(Value::from).collect()),
                );
            }
        }
        map
    }
}

fn usize_constraint(constraints: &Map<String, Value>, key: &str) -> Result<Option<usize>, String> {
    match constraints.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| format!("{} must be a non-negative integer", key)),
    }
}

fn i64_constraint(constraints: &Map<String, Value>, key: &str) -> Result<Option<i64>, String> {
    match constraints.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{} must be an integer", key)),
    }
}

fn f64_constraint(constraints: &Map<String, Value>, key: &str) -> Result<Option<f64>, String> {
    match constraints.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("{} must be a number", key)),
    }
}

/// Returns the JSON type name of a value for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Field definition as supplied by callers, before checking.
///
/// ```json
/// {"name": "age", "type": "integer", "required": true, "constraints": {"minimum": 0}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub constraints: Map<String, Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            required: false,
            description: None,
            constraints: Map::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn constraint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.constraints.insert(key.into(), value);
        self
    }
}

/// A checked field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldSpec", into = "FieldSpec")]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub description: Option<String>,
}

impl FieldDefinition {
    /// Optional field of the given type
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            description: None,
        }
    }

    /// Required field of the given type
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: true,
            ..Self::optional(name, field_type)
        }
    }

    /// Checks a raw `FieldSpec` into a definition.
    ///
    /// # Errors
    ///
    /// `SchemaError::InvalidField` on an empty name, unknown type name or a
    /// constraint that is malformed or does not belong to the type.
    pub fn parse(spec: FieldSpec) -> Result<Self, SchemaError> {
        let FieldSpec {
            name,
            type_name,
            required,
            description,
            constraints,
        } = spec;

        if name.trim().is_empty() {
            return Err(SchemaError::InvalidField {
                field: name,
                reason: "field name must not be empty".into(),
            });
        }

        let parsed = type_name
            .parse::<TypeKind>()
            .and_then(|kind| FieldType::parse(kind, &constraints));
        let field_type = match parsed {
            Ok(field_type) => field_type,
            Err(reason) => return Err(SchemaError::InvalidField { field: name, reason }),
        };

        Ok(Self {
            name,
            field_type,
            required,
            description,
        })
    }
}

impl TryFrom<FieldSpec> for FieldDefinition {
    type Error = SchemaError;

    fn try_from(spec: FieldSpec) -> Result<Self, Self::Error> {
        FieldDefinition::parse(spec)
    }
}

impl From<FieldDefinition> for FieldSpec {
    fn from(def: FieldDefinition) -> Self {
        let constraints = def.field_type.constraints();
        FieldSpec {
            name: def.name,
            type_name: def.field_type.type_name().to_string(),
            required: def.required,
            description: def.description,
            constraints,
        }
    }
}

/// Complete schema: named, versioned, ordered field definitions.
///
/// Field order is declaration order and is the order of normalized payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Unique schema identifier, immutable
    pub id: SchemaId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Bumped on every field mutation
    pub version: u64,
    pub fields: Vec<FieldDefinition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schema {
    /// Creates a version-1 schema. Field names are not checked here.
    pub fn new(
        id: SchemaId,
        name: impl Into<String>,
        description: Option<String>,
        fields: Vec<FieldDefinition>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description,
            version: 1,
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Looks up a field definition by name
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field in declaration order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Fails with `DuplicateField` on the first repeated name
    pub fn check_unique_names(&self) -> Result<(), SchemaError> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(())
    }
}
