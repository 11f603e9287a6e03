//! Inputs and reports of batch operations

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::Violation;
use crate::store::RecordId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteReport {
    pub deleted: Vec<RecordId>,
    pub not_found: Vec<RecordId>,
}

/// One item of a bulk update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub id: RecordId,
    pub data: Value,
    /// Merge over the stored data instead of replacing it
    #[serde(default)]
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub id: RecordId,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateReport {
    pub succeeded: Vec<RecordId>,
    pub failed: Vec<BulkFailure>,
}

/// How to bring stored records in line with an evolved schema.
///
/// Applied per record in this order: rename, remove, fill defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    /// Old key to new key
    #[serde(default)]
    pub field_mappings: BTreeMap<String, String>,
    /// Values for keys the record lacks
    #[serde(default)]
    pub default_values: Map<String, Value>,
    #[serde(default)]
    pub remove_fields: Vec<String>,
}

impl MigrationPlan {
    /// Applies the plan to a copy of stored data
    pub fn apply(&self, data: &Map<String, Value>) -> Map<String, Value> {
        let mut out = data.clone();
        for (from, to) in &self.field_mappings {
            if let Some(value) = out.remove(from) {
                out.insert(to.clone(), value);
            }
        }
        for key in &self.remove_fields {
            out.remove(key);
        }
        for (key, value) in &self.default_values {
            if !out.contains_key(key) {
                out.insert(key.clone(), value.clone());
            }
        }
        out
    }
}

/// A record that failed validation against the current schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordViolations {
    pub id: RecordId,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub total: usize,
    pub migrated: usize,
    pub failed: Vec<RecordViolations>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevalidationReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: Vec<RecordViolations>,
}
