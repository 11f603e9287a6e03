//! In-memory record store

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};
use tracing::debug;

use super::errors::{StoreError, StoreResult};
use super::record::{DynamicRecord, RecordId};
use super::table::{Change, RecordTable};
use super::RecordStore;
use crate::schema::SchemaId;

/// Record store that lives only as long as the process
#[derive(Debug)]
pub struct MemoryRecordStore {
    table: RwLock<RecordTable>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(RecordTable::new()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, RecordTable>> {
        self.table.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, RecordTable>> {
        self.table.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryRecordStore {
    fn put(&self, schema_id: SchemaId, data: Map<String, Value>) -> StoreResult<DynamicRecord> {
        let mut table = self.write()?;
        let record = table.allocate(schema_id, data);
        table.apply(Change::Image(record.clone()));
        debug!(record_id = %record.id, schema_id = %schema_id, "record stored");
        Ok(record)
    }

    fn get(&self, id: RecordId) -> StoreResult<DynamicRecord> {
        self.read()?.live(id).cloned()
    }

    fn list_by_schema(&self, schema_id: SchemaId) -> StoreResult<Vec<DynamicRecord>> {
        Ok(self.read()?.list(schema_id, false))
    }

    fn update(&self, id: RecordId, data: Map<String, Value>) -> StoreResult<DynamicRecord> {
        let mut table = self.write()?;
        let record = table.updated_image(id, data)?;
        table.apply(Change::Image(record.clone()));
        Ok(record)
    }

    fn delete(&self, id: RecordId) -> StoreResult<()> {
        let mut table = self.write()?;
        table.exists(id)?;
        table.apply(Change::Tombstone { id });
        Ok(())
    }

    fn soft_delete(&self, id: RecordId) -> StoreResult<DynamicRecord> {
        let mut table = self.write()?;
        let record = table.soft_deleted_image(id)?;
        table.apply(Change::Image(record.clone()));
        Ok(record)
    }

    fn restore(&self, id: RecordId) -> StoreResult<DynamicRecord> {
        let mut table = self.write()?;
        let record = table.restored_image(id)?;
        table.apply(Change::Image(record.clone()));
        Ok(record)
    }

    fn list_deleted(&self, schema_id: SchemaId) -> StoreResult<Vec<DynamicRecord>> {
        Ok(self.read()?.list(schema_id, true))
    }

    fn mark_orphaned(&self, schema_id: SchemaId) -> StoreResult<usize> {
        let mut table = self.write()?;
        let images = table.orphaned_images(schema_id);
        let count = images.len();
        for record in images {
            table.apply(Change::Image(record));
        }
        Ok(count)
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }
}
