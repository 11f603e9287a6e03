//! Record Lifecycle Tests
//!
//! - Writes are validated against the schema version current at write time
//! - Schema evolution never rewrites stored records by itself
//! - Deleting a schema orphans its records
//! - Migration and revalidation are explicit, reported operations
//! - The file-backed service comes back identical after a restart
//! - Schema ids are never reused, so orphans never join a new schema

use std::collections::BTreeMap;
use std::thread;

use dynschema::config::Config;
use dynschema::query::Predicate;
use dynschema::schema::{FieldSpec, SchemaId, ViolationReason};
use dynschema::service::{DynamicDataService, MigrationPlan, RecordUpdate, ServiceError};
use dynschema::store::RecordId;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

fn people(service: &DynamicDataService) -> SchemaId {
    service
        .registry()
        .create_schema(
            "people",
            None,
            vec![
                FieldSpec::new("name", "string").required(),
                FieldSpec::new("age", "integer").required(),
            ],
        )
        .unwrap()
        .id
}

#[test]
fn test_missing_required_rejects_write() {
    let service = DynamicDataService::in_memory();
    let id = people(&service);

    let err = service.create_record(id, &json!({"name": "A"})).unwrap_err();
    let violations = err.violations().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].field, "age");
    assert_eq!(violations[0].reason, ViolationReason::MissingRequiredField);
    assert_eq!(service.store().count().unwrap(), 0);
}

#[test]
fn test_enum_membership_enforced() {
    let service = DynamicDataService::in_memory();
    let id = service
        .registry()
        .create_schema(
            "accounts",
            None,
            vec![FieldSpec::new("status", "enum").constraint("values", json!(["active", "inactive"]))],
        )
        .unwrap()
        .id;

    let result = service.validate_payload(id, &json!({"status": "pending"})).unwrap();
    let violations = result.violations();
    assert_eq!(violations[0].field, "status");
    assert!(matches!(violations[0].reason, ViolationReason::NotInEnum { .. }));
}

#[test]
fn test_new_required_field_applies_to_later_writes_only() {
    let service = DynamicDataService::in_memory();
    let id = people(&service);
    let old = service.create_record(id, &json!({"name": "A", "age": 1})).unwrap();

    service
        .registry()
        .add_field(id, FieldSpec::new("email", "string").required())
        .unwrap();

    assert_eq!(service.get_record(old.id).unwrap(), old);
    assert!(service.create_record(id, &json!({"name": "B", "age": 2})).is_err());

    let report = service.revalidate(id).unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.valid, 0);
    assert_eq!(report.invalid[0].id, old.id);

    let err = service.patch_record(old.id, &json!({"age": 5})).unwrap_err();
    assert_eq!(err.code(), "DYN_VALIDATION_FAILED");
    let patched = service
        .patch_record(old.id, &json!({"email": "a@example.com"}))
        .unwrap();
    assert_eq!(
        Value::Object(patched.data),
        json!({"name": "A", "age": 1, "email": "a@example.com"})
    );
}

#[test]
fn test_patch_drops_keys_of_removed_fields() {
    let service = DynamicDataService::in_memory();
    let id = people(&service);
    service.registry().add_field(id, FieldSpec::new("nick", "string")).unwrap();
    let record = service
        .create_record(id, &json!({"name": "A", "age": 1, "nick": "a"}))
        .unwrap();

    service.registry().remove_field(id, "nick").unwrap();
    assert_eq!(service.get_record(record.id).unwrap().data["nick"], "a");

    let patched = service.patch_record(record.id, &json!({"age": 2})).unwrap();
    assert_eq!(Value::Object(patched.data), json!({"name": "A", "age": 2}));
}

#[test]
fn test_schema_delete_orphans_records() {
    let service = DynamicDataService::in_memory();
    let id = people(&service);
    let record = service.create_record(id, &json!({"name": "A", "age": 1})).unwrap();

    assert_eq!(service.delete_schema(id).unwrap(), 1);

    let orphan = service.get_record(record.id).unwrap();
    assert!(orphan.orphaned);
    let err = service.replace_record(record.id, &json!({"name": "B", "age": 2})).unwrap_err();
    assert!(matches!(err, ServiceError::Orphaned { .. }));
    assert_eq!(err.status_code(), 409);
    service.delete_record(record.id, true).unwrap();
}

#[test]
fn test_bulk_operations_report_per_record() {
    let service = DynamicDataService::in_memory();
    let id = people(&service);
    let a = service.create_record(id, &json!({"name": "A", "age": 1})).unwrap();
    let b = service.create_record(id, &json!({"name": "B", "age": 2})).unwrap();

    let report = service.bulk_update(&[
        RecordUpdate {
            id: a.id,
            data: json!({"age": 10}),
            partial: true,
        },
        RecordUpdate {
            id: b.id,
            data: json!({"age": "old"}),
            partial: true,
        },
        RecordUpdate {
            id: RecordId(99),
            data: json!({}),
            partial: false,
        },
    ]);
    assert_eq!(report.succeeded, [a.id]);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].violations[0].field, "age");
    assert_eq!(report.failed[1].code, "DYN_RECORD_NOT_FOUND");

    let report = service.bulk_delete(&[a.id, RecordId(99)], false).unwrap();
    assert_eq!(report.deleted, [a.id]);
    assert_eq!(report.not_found, [RecordId(99)]);
    assert_eq!(service.list_deleted(id).unwrap().len(), 1);
}

#[test]
fn test_migration_renames_and_defaults() {
    let service = DynamicDataService::in_memory();
    let id = service
        .registry()
        .create_schema("people", None, vec![FieldSpec::new("fullname", "string")])
        .unwrap()
        .id;
    let record = service.create_record(id, &json!({"fullname": "Ada"})).unwrap();

    let registry = service.registry();
    registry.add_field(id, FieldSpec::new("name", "string")).unwrap();
    registry.add_field(id, FieldSpec::new("age", "integer").required()).unwrap();
    registry.remove_field(id, "fullname").unwrap();

    let mut default_values = Map::new();
    default_values.insert("age".into(), json!(0));
    let plan = MigrationPlan {
        field_mappings: BTreeMap::from([("fullname".to_string(), "name".to_string())]),
        default_values,
        remove_fields: vec![],
    };

    let report = service.migrate_records(id, &plan).unwrap();
    assert_eq!(report.migrated, 1);
    assert!(report.failed.is_empty());
    assert_eq!(
        Value::Object(service.get_record(record.id).unwrap().data),
        json!({"name": "Ada", "age": 0})
    );
    assert_eq!(service.revalidate(id).unwrap().valid, 1);
}

#[test]
fn test_file_backed_service_restarts_cleanly() {
    let tmp = TempDir::new().unwrap();
    let config = Config {
        data_dir: Some(tmp.path().to_string_lossy().into_owned()),
        ..Config::default()
    };

    let (schema_id, record) = {
        let service = DynamicDataService::open(&config).unwrap();
        let id = people(&service);
        let record = service.create_record(id, &json!({"name": "A", "age": 3})).unwrap();
        service.patch_record(record.id, &json!({"age": 4})).unwrap();
        (id, record)
    };

    let service = DynamicDataService::open(&config).unwrap();
    assert_eq!(service.registry().get_schema(schema_id).unwrap().name, "people");
    let stored = service.get_record(record.id).unwrap();
    assert_eq!(stored.data["age"], 4);
    assert_eq!(stored.created_at, record.created_at);
}

#[test]
fn test_deleted_schema_id_not_reused_after_restart() {
    let tmp = TempDir::new().unwrap();
    let config = Config {
        data_dir: Some(tmp.path().to_string_lossy().into_owned()),
        ..Config::default()
    };

    let (old_id, old_record) = {
        let service = DynamicDataService::open(&config).unwrap();
        let id = service
            .registry()
            .create_schema("old", None, vec![FieldSpec::new("age", "integer")])
            .unwrap()
            .id;
        let record = service.create_record(id, &json!({"age": 40})).unwrap();
        assert_eq!(service.delete_schema(id).unwrap(), 1);
        (id, record)
    };

    let service = DynamicDataService::open(&config).unwrap();
    let new_id = service
        .registry()
        .create_schema("new", None, vec![FieldSpec::new("age", "integer")])
        .unwrap()
        .id;
    assert!(new_id > old_id);

    let found = service.query(new_id, &[Predicate::gte("age", 0)]).unwrap();
    assert!(found.is_empty());
    assert!(service.list_records(old_id).unwrap().is_empty());
    assert!(service.get_record(old_record.id).unwrap().orphaned);
}

/// Records created while their schema is being deleted still end up orphaned.
#[test]
fn test_create_racing_schema_delete_orphans_record() {
    for _ in 0..20 {
        let service = DynamicDataService::in_memory();
        let id = people(&service);

        let creator = {
            let service = service.clone();
            thread::spawn(move || {
                let mut created = Vec::new();
                for i in 0..200 {
                    match service.create_record(id, &json!({"name": "A", "age": i})) {
                        Ok(record) => created.push(record.id),
                        Err(e) => {
                            assert!(e.is_not_found());
                            break;
                        }
                    }
                }
                created
            })
        };
        thread::yield_now();
        service.delete_schema(id).unwrap();

        for record_id in creator.join().unwrap() {
            assert!(service.get_record(record_id).unwrap().orphaned);
        }
        assert!(service.list_records(id).unwrap().is_empty());
    }
}
