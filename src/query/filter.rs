//! Predicate compilation and record matching
//!
//! Predicates are checked against the schema once, up front: unknown fields,
//! operators that do not fit the field type and uninterpretable literals all
//! fail before any record is scanned. Matching itself never fails.
//!
//! A record whose value is absent, or whose stored value no longer has the
//! field's current type, does not match. This holds for `ne` as well.

use std::cmp::Ordering;

use serde_json::Value;

use super::errors::{QueryError, QueryResult};
use super::predicate::{Operator, Predicate};
use crate::schema::{integer_value, matches_kind, FieldDefinition, FieldType, Schema, TypeKind};
use crate::store::DynamicRecord;

/// Numeric literal, read with the field's numeric type
#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Integer(i128),
    /// Non-integral literal against an integer field
    Fraction(f64),
    Number(f64),
}

impl Numeric {
    /// Orders a stored value against this literal; `None` on a type mismatch
    fn compare(&self, stored: &Value) -> Option<Ordering> {
        match *self {
            Numeric::Integer(n) => integer_value(stored).map(|s| s.cmp(&n)),
            Numeric::Fraction(n) => integer_value(stored).and_then(|s| (s as f64).partial_cmp(&n)),
            Numeric::Number(n) => stored.as_f64().and_then(|s| s.partial_cmp(&n)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Test {
    /// Exact JSON equality; `kind` is `None` for nested paths
    Equals {
        kind: Option<TypeKind>,
        expected: Value,
        negate: bool,
    },
    Compare {
        op: Operator,
        operand: Numeric,
    },
    Text {
        op: Operator,
        needle: String,
    },
    OneOf(Vec<String>),
    /// Array holds an item equal to the operand
    Holds(Item),
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Numeric(Numeric),
    Exact(Value),
}

#[derive(Debug, Clone, PartialEq)]
struct Compiled {
    /// Field name, or dotted path into an object field
    path: String,
    nested: bool,
    test: Test,
}

impl Compiled {
    fn matches(&self, record: &DynamicRecord) -> bool {
        let stored = if self.nested {
            record.lookup(&self.path)
        } else {
            record.data.get(&self.path)
        };
        let Some(stored) = stored else {
            return false;
        };

        match &self.test {
            Test::Equals {
                kind,
                expected,
                negate,
            } => {
                if let Some(kind) = kind {
                    if !matches_kind(*kind, stored) {
                        return false;
                    }
                }
                (stored == expected) != *negate
            }
            Test::Compare { op, operand } => match operand.compare(stored) {
                Some(ordering) => match op {
                    Operator::Eq => ordering == Ordering::Equal,
                    Operator::Ne => ordering != Ordering::Equal,
                    Operator::Lt => ordering == Ordering::Less,
                    Operator::Lte => ordering != Ordering::Greater,
                    Operator::Gt => ordering == Ordering::Greater,
                    Operator::Gte => ordering != Ordering::Less,
                    _ => false,
                },
                None => false,
            },
            Test::Text { op, needle } => match stored.as_str() {
                Some(s) => match op {
                    Operator::Contains => s.contains(needle.as_str()),
                    Operator::StartsWith => s.starts_with(needle.as_str()),
                    Operator::EndsWith => s.ends_with(needle.as_str()),
                    _ => false,
                },
                None => false,
            },
            Test::OneOf(values) => stored
                .as_str()
                .map(|s| values.iter().any(|v| v == s))
                .unwrap_or(false),
            Test::Holds(item) => match stored.as_array() {
                Some(items) => items.iter().any(|candidate| match item {
                    Item::Numeric(n) => n.compare(candidate) == Some(Ordering::Equal),
                    Item::Exact(v) => candidate == v,
                }),
                None => false,
            },
        }
    }
}

/// A compiled conjunction of predicates
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    predicates: Vec<Compiled>,
}

impl Filter {
    /// Checks predicates against a schema snapshot.
    ///
    /// # Errors
    ///
    /// - `UnknownField` if a field (or the head of a dotted path) is not defined
    /// - `IncompatibleOperator` if the operator does not apply to the field type
    /// - `InvalidOperand` if the literal cannot be read as the field's type
    pub fn compile(schema: &Schema, predicates: &[Predicate]) -> QueryResult<Self> {
        let predicates = predicates
            .iter()
            .map(|p| compile_one(schema, p))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Self { predicates })
    }

    /// Logical AND of every predicate; an empty filter matches everything
    pub fn matches(&self, record: &DynamicRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

fn compile_one(schema: &Schema, predicate: &Predicate) -> QueryResult<Compiled> {
    if let Some(def) = schema.field(&predicate.field) {
        return Ok(Compiled {
            path: predicate.field.clone(),
            nested: false,
            test: compile_field(def, predicate)?,
        });
    }

    if let Some((head, _)) = predicate.field.split_once('.') {
        if let Some(def) = schema.field(head) {
            if def.field_type == FieldType::Object {
                if !predicate.op.is_equality() {
                    return Err(QueryError::IncompatibleOperator {
                        field: predicate.field.clone(),
                        operator: predicate.op,
                        field_type: "nested object",
                    });
                }
                return Ok(Compiled {
                    path: predicate.field.clone(),
                    nested: true,
                    test: Test::Equals {
                        kind: None,
                        expected: predicate.value.clone(),
                        negate: predicate.op == Operator::Ne,
                    },
                });
            }
        }
    }

    Err(QueryError::UnknownField {
        schema_id: schema.id,
        field: predicate.field.clone(),
    })
}

fn compile_field(def: &FieldDefinition, predicate: &Predicate) -> QueryResult<Test> {
    let field = predicate.field.as_str();
    let op = predicate.op;
    let value = &predicate.value;
    let negate = op == Operator::Ne;

    let test = match (&def.field_type, op) {
        (FieldType::Integer(_), op) if op.is_equality() || op.is_ordering() => Test::Compare {
            op,
            operand: integer_field_operand(field, value)?,
        },
        (FieldType::Number(_), op) if op.is_equality() || op.is_ordering() => Test::Compare {
            op,
            operand: Numeric::Number(number_operand(field, value)?),
        },
        (FieldType::String(_), Operator::Eq | Operator::Ne) => Test::Equals {
            kind: Some(TypeKind::String),
            expected: Value::String(string_operand(field, value)?),
            negate,
        },
        (FieldType::String(_), Operator::Contains | Operator::StartsWith | Operator::EndsWith) => {
            Test::Text {
                op,
                needle: string_operand(field, value)?,
            }
        }
        (FieldType::Boolean, Operator::Eq | Operator::Ne) => Test::Equals {
            kind: Some(TypeKind::Boolean),
            expected: Value::Bool(boolean_operand(field, value)?),
            negate,
        },
        (FieldType::Enum { values }, Operator::Eq | Operator::Ne) => Test::Equals {
            kind: Some(TypeKind::Enum),
            expected: Value::String(enum_member(field, values, value)?),
            negate,
        },
        (FieldType::Enum { values }, Operator::In) => Test::OneOf(enum_members(field, values, value)?),
        (FieldType::Object, Operator::Eq | Operator::Ne) => {
            if !value.is_object() {
                return Err(QueryError::operand(field, "expected an object"));
            }
            Test::Equals {
                kind: Some(TypeKind::Object),
                expected: value.clone(),
                negate,
            }
        }
        (FieldType::Array { item_type }, Operator::Eq | Operator::Ne) => {
            let items = value
                .as_array()
                .ok_or_else(|| QueryError::operand(field, "expected an array"))?;
            if let Some(bad) = items.iter().find(|v| !matches_kind(*item_type, v)) {
                return Err(QueryError::operand(
                    field,
                    format!("array item {} is not a {}", bad, item_type),
                ));
            }
            Test::Equals {
                kind: Some(TypeKind::Array),
                expected: value.clone(),
                negate,
            }
        }
        (FieldType::Array { item_type }, Operator::Contains) => {
            Test::Holds(item_operand(field, *item_type, value)?)
        }
        _ => {
            return Err(QueryError::IncompatibleOperator {
                field: field.to_string(),
                operator: op,
                field_type: def.field_type.type_name(),
            })
        }
    };
    Ok(test)
}

/// JSON integer or decimal string
fn integer_operand(field: &str, value: &Value) -> QueryResult<i128> {
    integer_value(value)
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<i128>().ok()))
        .ok_or_else(|| QueryError::operand(field, format!("expected an integer, got {}", value)))
}

/// Integer literal when integral, else the exact fractional value
fn integer_field_operand(field: &str, value: &Value) -> QueryResult<Numeric> {
    if let Ok(n) = integer_operand(field, value) {
        return Ok(Numeric::Integer(n));
    }
    let n = number_operand(field, value)?;
    if n.fract() == 0.0 && n.abs() < 1e18 {
        Ok(Numeric::Integer(n as i128))
    } else {
        Ok(Numeric::Fraction(n))
    }
}

/// Any JSON number or numeric string
fn number_operand(field: &str, value: &Value) -> QueryResult<f64> {
    value
        .as_f64()
        .or_else(|| {
            value
                .as_str()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|n| n.is_finite())
        })
        .ok_or_else(|| QueryError::operand(field, format!("expected a number, got {}", value)))
}

fn boolean_operand(field: &str, value: &Value) -> QueryResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        other => Err(QueryError::operand(
            field,
            format!("expected a boolean, got {}", other),
        )),
    }
}

fn string_operand(field: &str, value: &Value) -> QueryResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| QueryError::operand(field, format!("expected a string, got {}", value)))
}

fn enum_member(field: &str, allowed: &[String], value: &Value) -> QueryResult<String> {
    let member = string_operand(field, value)?;
    if !allowed.contains(&member) {
        return Err(QueryError::operand(
            field,
            format!("'{}' is not one of [{}]", member, allowed.join(", ")),
        ));
    }
    Ok(member)
}

/// JSON array of members or a comma-separated string
fn enum_members(field: &str, allowed: &[String], value: &Value) -> QueryResult<Vec<String>> {
    let raw: Vec<Value> = match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Value::from)
            .collect(),
        other => {
            return Err(QueryError::operand(
                field,
                format!("expected a list of values, got {}", other),
            ))
        }
    };
    if raw.is_empty() {
        return Err(QueryError::operand(field, "value list must not be empty"));
    }
    raw.iter().map(|v| enum_member(field, allowed, v)).collect()
}

fn item_operand(field: &str, item_type: TypeKind, value: &Value) -> QueryResult<Item> {
    let item = match item_type {
        TypeKind::Integer => Item::Numeric(integer_field_operand(field, value)?),
        TypeKind::Number => Item::Numeric(Numeric::Number(number_operand(field, value)?)),
        TypeKind::Boolean => Item::Exact(Value::Bool(boolean_operand(field, value)?)),
        TypeKind::String => Item::Exact(Value::String(string_operand(field, value)?)),
        _ => {
            if !matches_kind(item_type, value) {
                return Err(QueryError::operand(
                    field,
                    format!("expected a {} item, got {}", item_type, value),
                ));
            }
            Item::Exact(value.clone())
        }
    };
    Ok(item)
}
