//! Dynamic data service: validation in front of the record store
//!
//! Every write goes through a fresh validation against the current schema
//! snapshot. Schema changes never touch stored records; `migrate_records` and
//! `revalidate` are the explicit paths for bringing data in line afterwards.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::errors::{ServiceError, ServiceResult};
use super::reports::{
    BulkDeleteReport, BulkFailure, BulkUpdateReport, MigrationPlan, MigrationReport,
    RecordUpdate, RecordViolations, RevalidationReport,
};
use crate::config::Config;
use crate::query::{Predicate, QueryEngine, SearchPage, SearchRequest};
use crate::schema::{Schema, SchemaId, SchemaRegistry, SchemaValidator, ValidationMode, ValidationResult};
use crate::store::{DynamicRecord, FileRecordStore, MemoryRecordStore, RecordId, RecordStore};

/// Orchestrates registry, validator, store and query engine
#[derive(Debug, Clone)]
pub struct DynamicDataService {
    registry: Arc<SchemaRegistry>,
    store: Arc<dyn RecordStore>,
    validator: SchemaValidator,
    engine: QueryEngine,
}

impl DynamicDataService {
    pub fn new(registry: Arc<SchemaRegistry>, store: Arc<dyn RecordStore>, mode: ValidationMode) -> Self {
        let engine = QueryEngine::new(registry.clone(), store.clone());
        Self {
            registry,
            store,
            validator: SchemaValidator::new(mode),
            engine,
        }
    }

    /// In-memory service with strict validation
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(SchemaRegistry::in_memory()),
            Arc::new(MemoryRecordStore::new()),
            ValidationMode::Strict,
        )
    }

    /// Opens the registry and store described by the config
    pub fn open(config: &Config) -> ServiceResult<Self> {
        let (registry, store) = match config.data_path() {
            Some(dir) => {
                let store: Arc<dyn RecordStore> = Arc::new(FileRecordStore::open(dir)?);
                (SchemaRegistry::open(dir)?, store)
            }
            None => {
                let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
                (SchemaRegistry::in_memory(), store)
            }
        };
        let mut service = Self::new(Arc::new(registry), store, config.validation_mode);
        service.engine = service
            .engine
            .with_page_limits(config.default_page_size, config.max_page_size);
        Ok(service)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn validator(&self) -> SchemaValidator {
        self.validator
    }

    /// Validates a payload without storing it
    pub fn validate_payload(&self, schema_id: SchemaId, payload: &Value) -> ServiceResult<ValidationResult> {
        let schema = self.registry.get_schema(schema_id)?;
        Ok(self.validator.validate(&schema, payload))
    }

    /// Validates and stores a new record.
    ///
    /// # Errors
    ///
    /// `Rejected` with every violation if the payload does not validate.
    pub fn create_record(&self, schema_id: SchemaId, payload: &Value) -> ServiceResult<DynamicRecord> {
        let schema = self.registry.get_schema(schema_id)?;
        let data = accept(&schema, self.validator.validate(&schema, payload))?;
        let record = self.store.put(schema_id, data)?;
        info!(record_id = %record.id, schema_id = %schema_id, "record created");

        // A concurrent delete_schema may have orphaned the schema's records
        // before this put landed.
        match self.registry.get_schema(schema_id) {
            Ok(_) => Ok(record),
            Err(e) if e.is_not_found() => {
                self.store.mark_orphaned(schema_id)?;
                warn!(record_id = %record.id, schema_id = %schema_id, "schema deleted during create, record orphaned");
                Ok(self.store.get(record.id)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_record(&self, id: RecordId) -> ServiceResult<DynamicRecord> {
        Ok(self.store.get(id)?)
    }

    pub fn list_records(&self, schema_id: SchemaId) -> ServiceResult<Vec<DynamicRecord>> {
        Ok(self.store.list_by_schema(schema_id)?)
    }

    pub fn list_deleted(&self, schema_id: SchemaId) -> ServiceResult<Vec<DynamicRecord>> {
        Ok(self.store.list_deleted(schema_id)?)
    }

    /// Full replacement, re-validated against the current schema
    pub fn replace_record(&self, id: RecordId, payload: &Value) -> ServiceResult<DynamicRecord> {
        let (_, result) = self.check_update(id, payload, false)?;
        self.commit_update(id, result)
    }

    /// Merge over the stored data, then full re-validation
    pub fn patch_record(&self, id: RecordId, patch: &Value) -> ServiceResult<DynamicRecord> {
        let (_, result) = self.check_update(id, patch, true)?;
        self.commit_update(id, result)
    }

    /// Dry run of `replace_record` (`partial = false`) or `patch_record`
    pub fn check_update(
        &self,
        id: RecordId,
        payload: &Value,
        partial: bool,
    ) -> ServiceResult<(Arc<Schema>, ValidationResult)> {
        let record = self.store.get(id)?;
        let schema = self.owning_schema(&record)?;
        let result = if partial {
            self.validator.validate_patch(&schema, &record.data, payload)
        } else {
            self.validator.validate(&schema, payload)
        };
        Ok((schema, result))
    }

    /// Soft delete, or permanent removal when `force` is set
    pub fn delete_record(&self, id: RecordId, force: bool) -> ServiceResult<()> {
        if force {
            self.store.delete(id)?;
        } else {
            self.store.soft_delete(id)?;
        }
        info!(record_id = %id, force, "record deleted");
        Ok(())
    }

    pub fn restore_record(&self, id: RecordId) -> ServiceResult<DynamicRecord> {
        let record = self.store.restore(id)?;
        info!(record_id = %id, "record restored");
        Ok(record)
    }

    /// Deletes each id; missing ids are reported, not fatal
    pub fn bulk_delete(&self, ids: &[RecordId], force: bool) -> ServiceResult<BulkDeleteReport> {
        let mut report = BulkDeleteReport::default();
        for &id in ids {
            match self.delete_record(id, force) {
                Ok(()) => report.deleted.push(id),
                Err(e) if e.is_not_found() => report.not_found.push(id),
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Applies each update independently; one failure does not stop the batch
    pub fn bulk_update(&self, updates: &[RecordUpdate]) -> BulkUpdateReport {
        let mut report = BulkUpdateReport::default();
        for update in updates {
            let result = if update.partial {
                self.patch_record(update.id, &update.data)
            } else {
                self.replace_record(update.id, &update.data)
            };
            match result {
                Ok(record) => report.succeeded.push(record.id),
                Err(e) => report.failed.push(BulkFailure {
                    id: update.id,
                    code: e.code().to_string(),
                    message: e.to_string(),
                    violations: e.violations().map(<[_]>::to_vec).unwrap_or_default(),
                }),
            }
        }
        report
    }

    /// Deletes a schema and orphans its records; returns the orphan count
    pub fn delete_schema(&self, schema_id: SchemaId) -> ServiceResult<usize> {
        self.registry.delete_schema(schema_id)?;
        let orphaned = self.store.mark_orphaned(schema_id)?;
        if orphaned > 0 {
            warn!(schema_id = %schema_id, orphaned, "schema deleted with records, records orphaned");
        }
        Ok(orphaned)
    }

    /// Rewrites every live record of a schema through `plan` and re-validation.
    ///
    /// Keys the current schema does not declare are dropped. Records that
    /// still fail validation are left untouched and reported.
    pub fn migrate_records(&self, schema_id: SchemaId, plan: &MigrationPlan) -> ServiceResult<MigrationReport> {
        let schema = self.registry.get_schema(schema_id)?;
        let validator = SchemaValidator::lenient();
        let records = self.store.list_by_schema(schema_id)?;

        let mut report = MigrationReport {
            total: records.len(),
            ..Default::default()
        };
        for record in records {
            let candidate = Value::Object(plan.apply(&record.data));
            match validator.validate(&schema, &candidate) {
                ValidationResult::Accepted(data) => {
                    self.store.update(record.id, data)?;
                    report.migrated += 1;
                }
                ValidationResult::Rejected(violations) => report.failed.push(RecordViolations {
                    id: record.id,
                    violations,
                }),
            }
        }
        info!(
            schema_id = %schema_id,
            total = report.total,
            migrated = report.migrated,
            failed = report.failed.len(),
            "records migrated"
        );
        Ok(report)
    }

    /// Read-only check of stored records against the current schema
    pub fn revalidate(&self, schema_id: SchemaId) -> ServiceResult<RevalidationReport> {
        let schema = self.registry.get_schema(schema_id)?;
        let records = self.store.list_by_schema(schema_id)?;

        let mut report = RevalidationReport {
            total: records.len(),
            ..Default::default()
        };
        for record in records {
            match self.validator.validate(&schema, &Value::Object(record.data)) {
                ValidationResult::Accepted(_) => report.valid += 1,
                ValidationResult::Rejected(violations) => report.invalid.push(RecordViolations {
                    id: record.id,
                    violations,
                }),
            }
        }
        debug!(schema_id = %schema_id, total = report.total, invalid = report.invalid.len(), "records revalidated");
        Ok(report)
    }

    pub fn query(&self, schema_id: SchemaId, predicates: &[Predicate]) -> ServiceResult<Vec<DynamicRecord>> {
        Ok(self.engine.query(schema_id, predicates)?)
    }

    pub fn search(&self, schema_id: SchemaId, request: &SearchRequest) -> ServiceResult<SearchPage> {
        Ok(self.engine.search(schema_id, request)?)
    }

    fn owning_schema(&self, record: &DynamicRecord) -> ServiceResult<Arc<Schema>> {
        let orphaned = || ServiceError::Orphaned {
            record_id: record.id,
            schema_id: record.schema_id,
        };
        if record.orphaned {
            return Err(orphaned());
        }
        match self.registry.get_schema(record.schema_id) {
            Ok(schema) => Ok(schema),
            Err(e) if e.is_not_found() => Err(orphaned()),
            Err(e) => Err(e.into()),
        }
    }

    fn commit_update(&self, id: RecordId, result: ValidationResult) -> ServiceResult<DynamicRecord> {
        let data = match result {
            ValidationResult::Accepted(data) => data,
            ValidationResult::Rejected(violations) => {
                warn!(record_id = %id, violations = violations.len(), "update rejected");
                return Err(ServiceError::Rejected(violations));
            }
        };
        let record = self.store.update(id, data)?;
        info!(record_id = %id, "record updated");
        Ok(record)
    }
}

/// Lifts a rejection into an error for write paths
fn accept(schema: &Schema, result: ValidationResult) -> ServiceResult<serde_json::Map<String, Value>> {
    match result {
        ValidationResult::Accepted(data) => {
            debug!(schema_id = %schema.id, fields = data.len(), "payload accepted");
            Ok(data)
        }
        ValidationResult::Rejected(violations) => {
            warn!(schema_id = %schema.id, violations = violations.len(), "payload rejected");
            Err(ServiceError::Rejected(violations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, Violation, ViolationReason};
    use serde_json::json;

    fn service_with_people() -> (DynamicDataService, SchemaId) {
        let service = DynamicDataService::in_memory();
        let schema = service
            .registry()
            .create_schema(
                "people",
                None,
                vec![
                    FieldSpec::new("name", "string").required(),
                    FieldSpec::new("age", "integer").required(),
                ],
            )
            .unwrap();
        (service, schema.id)
    }

    #[test]
    fn test_create_and_get_round_trip() {
        let (service, schema_id) = service_with_people();
        let record = service
            .create_record(schema_id, &json!({"age": 3, "name": "A"}))
            .unwrap();
        let fetched = service.get_record(record.id).unwrap();
        assert_eq!(fetched.data, record.data);
        assert_eq!(fetched.data.keys().collect::<Vec<_>>(), vec!["name", "age"]);
    }

    #[test]
    fn test_create_rejected_lists_violations() {
        let (service, schema_id) = service_with_people();
        let err = service.create_record(schema_id, &json!({"name": "A"})).unwrap_err();
        assert_eq!(err.violations(), Some(&[Violation::missing("age")][..]));
        assert_eq!(service.store().count().unwrap(), 0);
    }

    #[test]
    fn test_replace_and_patch_revalidate() {
        let (service, schema_id) = service_with_people();
        let record = service
            .create_record(schema_id, &json!({"name": "A", "age": 3}))
            .unwrap();

        let patched = service.patch_record(record.id, &json!({"age": 4})).unwrap();
        assert_eq!(patched.data["name"], "A");
        assert_eq!(patched.data["age"], 4);

        let err = service.replace_record(record.id, &json!({"age": 5})).unwrap_err();
        assert_eq!(err.code(), "DYN_VALIDATION_FAILED");
        assert_eq!(service.get_record(record.id).unwrap().data["age"], 4);
    }

    #[test]
    fn test_check_update_is_dry_run() {
        let (service, schema_id) = service_with_people();
        let record = service
            .create_record(schema_id, &json!({"name": "A", "age": 3}))
            .unwrap();
        let (_, result) = service.check_update(record.id, &json!({"age": 9}), true).unwrap();
        assert!(result.is_accepted());
        assert_eq!(service.get_record(record.id).unwrap().data["age"], 3);
    }

    #[test]
    fn test_soft_delete_restore_and_force() {
        let (service, schema_id) = service_with_people();
        let record = service
            .create_record(schema_id, &json!({"name": "A", "age": 3}))
            .unwrap();

        service.delete_record(record.id, false).unwrap();
        assert!(service.get_record(record.id).unwrap_err().is_not_found());
        assert_eq!(service.list_deleted(schema_id).unwrap().len(), 1);

        service.restore_record(record.id).unwrap();
        service.delete_record(record.id, true).unwrap();
        assert!(service.restore_record(record.id).is_err());
    }

    #[test]
    fn test_bulk_operations() {
        let (service, schema_id) = service_with_people();
        let a = service.create_record(schema_id, &json!({"name": "A", "age": 1})).unwrap();
        let b = service.create_record(schema_id, &json!({"name": "B", "age": 2})).unwrap();

        let report = service.bulk_update(&[
            RecordUpdate {
                id: a.id,
                data: json!({"age": 10}),
                partial: true,
            },
            RecordUpdate {
                id: b.id,
                data: json!({"age": "x"}),
                partial: true,
            },
            RecordUpdate {
                id: RecordId(99),
                data: json!({}),
                partial: false,
            },
        ]);
        assert_eq!(report.succeeded, vec![a.id]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].code, "DYN_VALIDATION_FAILED");
        assert!(matches!(
            report.failed[0].violations[0].reason,
            ViolationReason::TypeMismatch { .. }
        ));
        assert_eq!(report.failed[1].code, "DYN_RECORD_NOT_FOUND");

        let report = service.bulk_delete(&[a.id, RecordId(99)], false).unwrap();
        assert_eq!(report.deleted, vec![a.id]);
        assert_eq!(report.not_found, vec![RecordId(99)]);
    }

    #[test]
    fn test_delete_schema_orphans_records() {
        let (service, schema_id) = service_with_people();
        let record = service
            .create_record(schema_id, &json!({"name": "A", "age": 3}))
            .unwrap();

        assert_eq!(service.delete_schema(schema_id).unwrap(), 1);
        let orphan = service.get_record(record.id).unwrap();
        assert!(orphan.orphaned);

        let err = service.patch_record(record.id, &json!({"age": 4})).unwrap_err();
        assert_eq!(err.code(), "DYN_RECORD_ORPHANED");
        assert!(service.create_record(schema_id, &json!({})).unwrap_err().is_not_found());
    }

    #[test]
    fn test_migrate_after_rename() {
        let (service, schema_id) = service_with_people();
        let record = service
            .create_record(schema_id, &json!({"name": "A", "age": 3}))
            .unwrap();
        service
            .registry()
            .update_field(schema_id, "name", FieldSpec::new("full_name", "string").required())
            .unwrap();
        service
            .registry()
            .add_field(schema_id, FieldSpec::new("active", "boolean").required())
            .unwrap();

        let before = service.revalidate(schema_id).unwrap();
        assert_eq!(before.invalid.len(), 1);

        let plan = MigrationPlan {
            field_mappings: [("name".to_string(), "full_name".to_string())].into_iter().collect(),
            default_values: json!({"active": true}).as_object().cloned().unwrap(),
            remove_fields: Vec::new(),
        };
        let report = service.migrate_records(schema_id, &plan).unwrap();
        assert_eq!((report.total, report.migrated), (1, 1));

        let migrated = service.get_record(record.id).unwrap();
        assert_eq!(
            migrated.data.keys().collect::<Vec<_>>(),
            vec!["full_name", "age", "active"]
        );
        assert_eq!(service.revalidate(schema_id).unwrap().valid, 1);
    }

    #[test]
    fn test_migrate_reports_failures_without_writing() {
        let (service, schema_id) = service_with_people();
        let record = service
            .create_record(schema_id, &json!({"name": "A", "age": 3}))
            .unwrap();
        service
            .registry()
            .add_field(schema_id, FieldSpec::new("email", "string").required())
            .unwrap();

        let report = service.migrate_records(schema_id, &MigrationPlan::default()).unwrap();
        assert_eq!(report.migrated, 0);
        assert_eq!(report.failed[0].id, record.id);
        assert_eq!(report.failed[0].violations, vec![Violation::missing("email")]);
        assert!(!service.get_record(record.id).unwrap().data.contains_key("email"));
    }
}
