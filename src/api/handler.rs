//! API handler for dynschema
//!
//! Dispatches one request to the service inside a `request` span carrying the
//! request id and op name. Errors become error responses; nothing here panics.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info_span, warn};
use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use super::request::Request;
use super::response::Response;
use crate::schema::ValidationResult;
use crate::service::DynamicDataService;

#[derive(Debug, Clone)]
pub struct ApiHandler {
    service: DynamicDataService,
}

impl ApiHandler {
    pub fn new(service: DynamicDataService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &DynamicDataService {
        &self.service
    }

    /// Handle a raw JSON request line
    pub fn handle_json(&self, json_request: &str) -> Response {
        match Request::parse(json_request) {
            Ok((request_id, request)) => self.handle_with_id(request_id, request),
            Err(e) => {
                warn!(error = %e, "unparsable request");
                Response::error(&e)
            }
        }
    }

    /// Handle a request under a fresh request id
    pub fn handle(&self, request: Request) -> Response {
        self.handle_with_id(None, request)
    }

    pub fn handle_with_id(&self, request_id: Option<String>, request: Request) -> Response {
        let request_id = request_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = info_span!("request", request_id = %request_id, op = request.op());
        let _enter = span.enter();

        let response = match self.dispatch(request) {
            Ok(data) => Response::success(data),
            Err(e) => {
                if e.status_code() >= 500 {
                    warn!(code = e.code(), error = %e, "request failed");
                }
                Response::error(&e)
            }
        };
        response.with_request_id(request_id)
    }

    fn dispatch(&self, request: Request) -> ApiResult<Value> {
        let service = &self.service;
        let registry = service.registry();

        match request {
            Request::CreateSchema {
                name,
                description,
                fields,
            } => to_data(registry.create_schema(name, description, fields)?),
            Request::GetSchema { schema_id } => to_data(registry.get_schema(schema_id)?),
            Request::ListSchemas => to_data(registry.list_schemas()?),
            Request::UpdateSchema {
                schema_id,
                name,
                description,
            } => to_data(registry.update_metadata(schema_id, name, description)?),
            Request::DeleteSchema { schema_id } => {
                let orphaned = service.delete_schema(schema_id)?;
                Ok(json!({"schema_id": schema_id, "orphaned_records": orphaned}))
            }
            Request::AddField { schema_id, field } => to_data(registry.add_field(schema_id, field)?),
            Request::AddFields { schema_id, fields } => {
                to_data(registry.add_fields(schema_id, fields)?)
            }
            Request::UpdateField {
                schema_id,
                field_name,
                field,
            } => to_data(registry.update_field(schema_id, &field_name, field)?),
            Request::RemoveField {
                schema_id,
                field_name,
            } => to_data(registry.remove_field(schema_id, &field_name)?),
            Request::CheckField { schema_id, field } => {
                to_data(registry.check_field(schema_id, field)?)
            }
            Request::Validate { schema_id, data } => {
                validation_data(service.validate_payload(schema_id, &data)?)
            }
            Request::CreateRecord { schema_id, data } => {
                to_data(service.create_record(schema_id, &data)?)
            }
            Request::GetRecord { record_id } => to_data(service.get_record(record_id)?),
            Request::ListRecords { schema_id, deleted } => {
                if deleted {
                    to_data(service.list_deleted(schema_id)?)
                } else {
                    to_data(service.list_records(schema_id)?)
                }
            }
            Request::ReplaceRecord { record_id, data } => {
                to_data(service.replace_record(record_id, &data)?)
            }
            Request::PatchRecord { record_id, data } => {
                to_data(service.patch_record(record_id, &data)?)
            }
            Request::CheckUpdate {
                record_id,
                data,
                partial,
            } => {
                let (_, result) = service.check_update(record_id, &data, partial)?;
                validation_data(result)
            }
            Request::DeleteRecord { record_id, force } => {
                service.delete_record(record_id, force)?;
                Ok(json!({"record_id": record_id, "force": force}))
            }
            Request::RestoreRecord { record_id } => to_data(service.restore_record(record_id)?),
            Request::BulkDelete { record_ids, force } => {
                to_data(service.bulk_delete(&record_ids, force)?)
            }
            Request::BulkUpdate { updates } => to_data(service.bulk_update(&updates)),
            Request::Query {
                schema_id,
                predicates,
            } => to_data(service.query(schema_id, &predicates)?),
            Request::Search { schema_id, search } => to_data(service.search(schema_id, &search)?),
            Request::MigrateRecords { schema_id, plan } => {
                to_data(service.migrate_records(schema_id, &plan)?)
            }
            Request::Revalidate { schema_id } => to_data(service.revalidate(schema_id)?),
        }
    }
}

fn to_data<T: Serialize>(value: T) -> ApiResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::Internal(format!("failed to serialize response: {}", e)))
}

/// A rejection is a normal outcome of `validate`, reported as data
fn validation_data(result: ValidationResult) -> ApiResult<Value> {
    match result {
        ValidationResult::Accepted(data) => Ok(json!({"valid": true, "data": data})),
        ValidationResult::Rejected(violations) => {
            Ok(json!({"valid": false, "violations": to_data(violations)?}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> ApiHandler {
        ApiHandler::new(DynamicDataService::in_memory())
    }

    fn ok_data(response: Response) -> Value {
        match response {
            Response::Ok { data, .. } => data,
            Response::Error { code, message, .. } => panic!("{}: {}", code, message),
        }
    }

    fn create_people(handler: &ApiHandler) -> u64 {
        let data = ok_data(handler.handle_json(
            r#"{"op": "create_schema", "name": "people", "fields": [
                {"name": "name", "type": "string", "required": true},
                {"name": "age", "type": "integer", "required": true}]}"#,
        ));
        data["id"].as_u64().unwrap()
    }

    #[test]
    fn test_schema_and_record_flow() {
        let handler = handler();
        let schema_id = create_people(&handler);

        let record = ok_data(handler.handle_json(&format!(
            r#"{{"op": "create_record", "schema_id": {}, "data": {{"name": "A", "age": 30}}}}"#,
            schema_id
        )));
        assert_eq!(record["data"]["age"], 30);

        let found = ok_data(handler.handle_json(&format!(
            r#"{{"op": "query", "schema_id": {}, "predicates": [{{"field": "age", "op": "gt", "value": "20"}}]}}"#,
            schema_id
        )));
        assert_eq!(found.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_validate_reports_rejection_as_data() {
        let handler = handler();
        let schema_id = create_people(&handler);
        let data = ok_data(handler.handle_json(&format!(
            r#"{{"op": "validate", "schema_id": {}, "data": {{"name": "A"}}}}"#,
            schema_id
        )));
        assert_eq!(data["valid"], false);
        assert_eq!(data["violations"][0]["field"], "age");
        assert_eq!(data["violations"][0]["reason"], "MissingRequiredField");
    }

    #[test]
    fn test_rejected_write_is_error_with_violations() {
        let handler = handler();
        let schema_id = create_people(&handler);
        let response = handler.handle_json(&format!(
            r#"{{"op": "create_record", "schema_id": {}, "data": {{"name": 1, "age": 2}}}}"#,
            schema_id
        ));
        match response {
            Response::Error {
                code,
                status_code,
                violations,
                request_id,
                ..
            } => {
                assert_eq!(code, "DYN_VALIDATION_FAILED");
                assert_eq!(status_code, 422);
                assert_eq!(violations.len(), 1);
                assert!(request_id.is_some());
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_request_id_echoed() {
        let handler = handler();
        match handler.handle_json(r#"{"op": "list_schemas", "request_id": "req-7"}"#) {
            Response::Ok { request_id, data } => {
                assert_eq!(request_id.as_deref(), Some("req-7"));
                assert_eq!(data, json!([]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_found_and_bad_request() {
        let handler = handler();
        let response = handler.handle(Request::GetSchema {
            schema_id: crate::schema::SchemaId(5),
        });
        let json: Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(json["code"], "DYN_SCHEMA_NOT_FOUND");
        assert_eq!(json["status_code"], 404);

        let json: Value = serde_json::from_str(&handler.handle_json("nope").to_json()).unwrap();
        assert_eq!(json["code"], "DYN_INVALID_REQUEST");
    }
}
