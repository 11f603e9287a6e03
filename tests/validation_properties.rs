//! Validation Property Tests
//!
//! - Accepted output holds exactly the declared keys present in the payload
//! - A missing required field is always reported
//! - Re-validating accepted output is a no-op
//! - Stored data equals the accepted output

use dynschema::schema::{
    FieldSpec, Schema, SchemaRegistry, SchemaValidator, ValidationMode, ValidationResult,
    ViolationReason,
};
use dynschema::store::{MemoryRecordStore, RecordStore};
use serde_json::{json, Value};

fn schema() -> std::sync::Arc<Schema> {
    SchemaRegistry::in_memory()
        .create_schema(
            "profile",
            None,
            vec![
                FieldSpec::new("name", "string").required().constraint("maxLength", json!(20)),
                FieldSpec::new("age", "integer").constraint("minimum", json!(0)),
                FieldSpec::new("score", "number"),
                FieldSpec::new("active", "boolean"),
                FieldSpec::new("status", "enum").constraint("values", json!(["active", "inactive"])),
                FieldSpec::new("tags", "array").constraint("itemType", json!("string")),
                FieldSpec::new("meta", "object"),
            ],
        )
        .unwrap()
}

fn payloads() -> Vec<Value> {
    vec![
        json!({"name": "A"}),
        json!({"meta": {"x": 1}, "name": "B", "age": 4}),
        json!({"name": "C", "score": 1, "tags": [], "status": "inactive"}),
        json!({"name": "D", "score": 2.5, "active": false, "tags": ["a", "b"]}),
        json!({"tags": ["x"], "name": "E", "age": 0, "active": true, "meta": {}}),
    ]
}

#[test]
fn test_accepted_keys_are_declared_and_in_schema_order() {
    let schema = schema();
    let validator = SchemaValidator::new(ValidationMode::Lenient);

    for mut payload in payloads() {
        payload["unknown"] = json!("dropped");
        let normalized = validator.validate(&schema, &payload).into_result().unwrap();

        let keys: Vec<&str> = normalized.keys().map(String::as_str).collect();
        let expected: Vec<&str> = schema
            .field_names()
            .filter(|name| payload.get(*name).is_some())
            .collect();
        assert_eq!(keys, expected);
    }
}

#[test]
fn test_strict_rejects_unknown_keys() {
    let schema = schema();
    let result = SchemaValidator::strict().validate(&schema, &json!({"name": "A", "x": 1}));
    let violations = result.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].field, "x");
    assert_eq!(violations[0].reason, ViolationReason::UnknownField);
}

#[test]
fn test_missing_required_is_always_reported() {
    let schema = schema();
    let validator = SchemaValidator::strict();
    let bad = [
        json!({}),
        json!({"age": 3}),
        json!({"age": "three", "tags": [1]}),
    ];
    for payload in bad {
        let result = validator.validate(&schema, &payload);
        assert!(result
            .violations()
            .iter()
            .any(|v| v.field == "name" && v.reason == ViolationReason::MissingRequiredField));
    }
}

#[test]
fn test_all_violations_reported_together() {
    let schema = schema();
    let result = SchemaValidator::strict().validate(
        &schema,
        &json!({"age": -1, "score": "high", "status": "pending", "tags": ["ok", 2]}),
    );
    let fields: Vec<&str> = result.violations().iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, ["name", "age", "score", "status", "tags[1]"]);
}

#[test]
fn test_revalidation_is_idempotent() {
    let schema = schema();
    let validator = SchemaValidator::strict();
    for payload in payloads() {
        let normalized = validator.validate(&schema, &payload).into_result().unwrap();
        let again = validator.validate(&schema, &Value::Object(normalized.clone()));
        assert_eq!(again, ValidationResult::Accepted(normalized));
    }
}

#[test]
fn test_stored_data_equals_normalized_payload() {
    let schema = schema();
    let store = MemoryRecordStore::new();
    let validator = SchemaValidator::strict();

    for payload in payloads() {
        let normalized = validator.validate(&schema, &payload).into_result().unwrap();
        let record = store.put(schema.id, normalized.clone()).unwrap();
        assert_eq!(store.get(record.id).unwrap().data, normalized);
    }
}

#[test]
fn test_non_object_payload_is_shape_violation() {
    let schema = schema();
    for payload in [json!([]), json!("x"), json!(null), json!(3)] {
        let result = SchemaValidator::strict().validate(&schema, &payload);
        assert!(matches!(
            result.violations()[0].reason,
            ViolationReason::InvalidPayloadShape { .. }
        ));
    }
}
