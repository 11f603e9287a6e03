//! API request types
//!
//! One JSON object per request, tagged by `op`:
//!
//! ```json
//! {"op": "create_record", "schema_id": 1, "data": {"name": "A"}}
//! ```
//!
//! An optional top-level `request_id` is echoed in the response and logged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{ApiError, ApiResult};
use crate::query::{Predicate, SearchRequest};
use crate::schema::{FieldSpec, SchemaId};
use crate::service::{MigrationPlan, RecordUpdate};
use crate::store::RecordId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CreateSchema {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        fields: Vec<FieldSpec>,
    },
    GetSchema {
        schema_id: SchemaId,
    },
    ListSchemas,
    UpdateSchema {
        schema_id: SchemaId,
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
    DeleteSchema {
        schema_id: SchemaId,
    },
    AddField {
        schema_id: SchemaId,
        field: FieldSpec,
    },
    AddFields {
        schema_id: SchemaId,
        fields: Vec<FieldSpec>,
    },
    UpdateField {
        schema_id: SchemaId,
        field_name: String,
        field: FieldSpec,
    },
    RemoveField {
        schema_id: SchemaId,
        field_name: String,
    },
    CheckField {
        schema_id: SchemaId,
        field: FieldSpec,
    },
    Validate {
        schema_id: SchemaId,
        data: Value,
    },
    CreateRecord {
        schema_id: SchemaId,
        data: Value,
    },
    GetRecord {
        record_id: RecordId,
    },
    ListRecords {
        schema_id: SchemaId,
        /// List soft-deleted records instead of live ones
        #[serde(default)]
        deleted: bool,
    },
    ReplaceRecord {
        record_id: RecordId,
        data: Value,
    },
    PatchRecord {
        record_id: RecordId,
        data: Value,
    },
    CheckUpdate {
        record_id: RecordId,
        data: Value,
        #[serde(default)]
        partial: bool,
    },
    DeleteRecord {
        record_id: RecordId,
        #[serde(default)]
        force: bool,
    },
    RestoreRecord {
        record_id: RecordId,
    },
    BulkDelete {
        record_ids: Vec<RecordId>,
        #[serde(default)]
        force: bool,
    },
    BulkUpdate {
        updates: Vec<RecordUpdate>,
    },
    Query {
        schema_id: SchemaId,
        #[serde(default)]
        predicates: Vec<Predicate>,
    },
    Search {
        schema_id: SchemaId,
        #[serde(default)]
        search: SearchRequest,
    },
    MigrateRecords {
        schema_id: SchemaId,
        #[serde(default)]
        plan: MigrationPlan,
    },
    Revalidate {
        schema_id: SchemaId,
    },
}

impl Request {
    /// Parses a request line, returning it with its `request_id` if any
    pub fn parse(json: &str) -> ApiResult<(Option<String>, Self)> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ApiError::invalid_request(format!("Invalid JSON: {}", e)))?;
        let request_id = value
            .get("request_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let request = serde_json::from_value(value)
            .map_err(|e| ApiError::invalid_request(e.to_string()))?;
        Ok((request_id, request))
    }

    /// The `op` tag, for logging
    pub fn op(&self) -> &'static str {
        match self {
            Request::CreateSchema { .. } => "create_schema",
            Request::GetSchema { .. } => "get_schema",
            Request::ListSchemas => "list_schemas",
            Request::UpdateSchema { .. } => "update_schema",
            Request::DeleteSchema { .. } => "delete_schema",
            Request::AddField { .. } => "add_field",
            Request::AddFields { .. } => "add_fields",
            Request::UpdateField { .. } => "update_field",
            Request::RemoveField { .. } => "remove_field",
            Request::CheckField { .. } => "check_field",
            Request::Validate { .. } => "validate",
            Request::CreateRecord { .. } => "create_record",
            Request::GetRecord { .. } => "get_record",
            Request::ListRecords { .. } => "list_records",
            Request::ReplaceRecord { .. } => "replace_record",
            Request::PatchRecord { .. } => "patch_record",
            Request::CheckUpdate { .. } => "check_update",
            Request::DeleteRecord { .. } => "delete_record",
            Request::RestoreRecord { .. } => "restore_record",
            Request::BulkDelete { .. } => "bulk_delete",
            Request::BulkUpdate { .. } => "bulk_update",
            Request::Query { .. } => "query",
            Request::Search { .. } => "search",
            Request::MigrateRecords { .. } => "migrate_records",
            Request::Revalidate { .. } => "revalidate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Operator;

    #[test]
    fn test_parse_create_schema() {
        let (id, request) = Request::parse(
            r#"{"op": "create_schema", "request_id": "abc", "name": "people",
                "fields": [{"name": "age", "type": "integer", "required": true}]}"#,
        )
        .unwrap();
        assert_eq!(id.as_deref(), Some("abc"));
        match request {
            Request::CreateSchema { name, fields, description } => {
                assert_eq!(name, "people");
                assert_eq!(fields.len(), 1);
                assert!(description.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_query_with_symbol_operator() {
        let (_, request) = Request::parse(
            r#"{"op": "query", "schema_id": 3, "predicates": [{"field": "age", "op": ">=", "value": 20}]}"#,
        )
        .unwrap();
        assert_eq!(request.op(), "query");
        let Request::Query { schema_id, predicates } = request else {
            panic!("not a query");
        };
        assert_eq!(schema_id, SchemaId(3));
        assert_eq!(predicates[0].op, Operator::Gte);
    }

    #[test]
    fn test_parse_unit_op() {
        let (id, request) = Request::parse(r#"{"op": "list_schemas"}"#).unwrap();
        assert!(id.is_none());
        assert_eq!(request, Request::ListSchemas);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Request::parse("{").is_err());
        assert!(Request::parse(r#"{"op": "drop_table"}"#).is_err());
        let err = Request::parse(r#"{"op": "get_record"}"#).unwrap_err();
        assert_eq!(err.code(), "DYN_INVALID_REQUEST");
    }
}
