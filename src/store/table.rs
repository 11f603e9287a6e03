//! In-memory record table shared by both store implementations
//!
//! Methods that change state come in two steps: a `*_image` method computes
//! the new record image without touching the table, then `apply` installs it.
//! The file store appends the image to its log between the two.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use super::record::{DynamicRecord, RecordId};
use crate::schema::SchemaId;

/// One state change, as written to the record log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub(crate) enum Change {
    /// Full record image; last image wins
    Image(DynamicRecord),
    /// Hard delete
    Tombstone { id: RecordId },
}

#[derive(Debug)]
pub(crate) struct RecordTable {
    /// Records by id, which is creation order
    records: BTreeMap<RecordId, DynamicRecord>,
    next_id: u64,
}

impl RecordTable {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Hands out the next id and builds a fresh record around it
    pub fn allocate(&mut self, schema_id: SchemaId, data: Map<String, Value>) -> DynamicRecord {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        DynamicRecord::new(id, schema_id, data)
    }

    pub fn apply(&mut self, change: Change) {
        match change {
            Change::Image(record) => {
                self.next_id = self.next_id.max(record.id.0 + 1);
                self.records.insert(record.id, record);
            }
            Change::Tombstone { id } => {
                self.next_id = self.next_id.max(id.0 + 1);
                self.records.remove(&id);
            }
        }
    }

    /// A record that is not soft-deleted
    pub fn live(&self, id: RecordId) -> StoreResult<&DynamicRecord> {
        self.records
            .get(&id)
            .filter(|r| !r.deleted)
            .ok_or(StoreError::RecordNotFound(id))
    }

    pub fn exists(&self, id: RecordId) -> StoreResult<()> {
        if self.records.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::RecordNotFound(id))
        }
    }

    /// Records of a schema by deleted flag. Orphaned records are never listed.
    pub fn list(&self, schema_id: SchemaId, deleted: bool) -> Vec<DynamicRecord> {
        self.records
            .values()
            .filter(|r| r.schema_id == schema_id && r.deleted == deleted && !r.orphaned)
            .cloned()
            .collect()
    }

    pub fn updated_image(&self, id: RecordId, data: Map<String, Value>) -> StoreResult<DynamicRecord> {
        let mut record = self.live(id)?.clone();
        record.data = data;
        record.touch();
        Ok(record)
    }

    pub fn soft_deleted_image(&self, id: RecordId) -> StoreResult<DynamicRecord> {
        let mut record = self.live(id)?.clone();
        record.deleted = true;
        record.touch();
        Ok(record)
    }

    /// Only a soft-deleted record can be restored
    pub fn restored_image(&self, id: RecordId) -> StoreResult<DynamicRecord> {
        let mut record = self
            .records
            .get(&id)
            .filter(|r| r.deleted)
            .cloned()
            .ok_or(StoreError::RecordNotFound(id))?;
        record.deleted = false;
        record.touch();
        Ok(record)
    }

    /// Images for every not-yet-orphaned record of the schema
    pub fn orphaned_images(&self, schema_id: SchemaId) -> Vec<DynamicRecord> {
        self.records
            .values()
            .filter(|r| r.schema_id == schema_id && !r.orphaned)
            .map(|r| {
                let mut record = r.clone();
                record.orphaned = true;
                record.touch();
                record
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.values().filter(|r| !r.deleted).count()
    }
}
