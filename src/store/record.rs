//! Dynamic record type

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::SchemaId;

/// Record identifier, allocated by the store in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored payload, validated against its schema at write time.
///
/// `data` is kept exactly as handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicRecord {
    pub id: RecordId,
    /// Non-owning reference to the schema the data was validated against
    pub schema_id: SchemaId,
    pub data: Map<String, Value>,
    /// Soft-deleted records are hidden from reads and queries
    #[serde(default)]
    pub deleted: bool,
    /// Set once the owning schema has been deleted
    #[serde(default)]
    pub orphaned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DynamicRecord {
    pub fn new(id: RecordId, schema_id: SchemaId, data: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id,
            schema_id,
            data,
            deleted: false,
            orphaned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Resolves a dotted path (`address.city`) inside the data
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Copy with `data` reduced to the given keys
    pub fn project(&self, fields: &[String]) -> Self {
        let data = self
            .data
            .iter()
            .filter(|(k, _)| fields.iter().any(|f| f == *k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            data,
            ..self.clone()
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
