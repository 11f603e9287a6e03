//! Dynamic record store for dynschema
//!
//! A dumb, id-indexed store of validated payloads. It never validates:
//! callers hand it data already produced by the validator, and `get` returns
//! exactly what `put` or `update` stored.
//!
//! # Design Principles
//!
//! - Record ids are monotonic, so id order is creation order
//! - Each `put`/`update`/`delete` is atomic
//! - Soft-deleted records are invisible to `get` and `list_by_schema`
//! - Orphaned records stay readable
//! - File store: append-only, checksum-verified, full-image writes

mod checksum;
mod errors;
mod file;
mod memory;
mod record;
mod table;

use std::fmt::Debug;

use serde_json::{Map, Value};

use crate::schema::SchemaId;

pub use checksum::compute_checksum;
pub use errors::{StoreError, StoreResult};
pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;
pub use record::{DynamicRecord, RecordId};

/// Storage boundary for dynamic records
pub trait RecordStore: Send + Sync + Debug {
    /// Stores a new record under a fresh id
    fn put(&self, schema_id: SchemaId, data: Map<String, Value>) -> StoreResult<DynamicRecord>;

    /// Live record by id; `RecordNotFound` if absent or soft-deleted
    fn get(&self, id: RecordId) -> StoreResult<DynamicRecord>;

    /// Live, non-orphaned records of a schema in creation order
    fn list_by_schema(&self, schema_id: SchemaId) -> StoreResult<Vec<DynamicRecord>>;

    /// Replaces the data of a live record. No re-validation happens here.
    fn update(&self, id: RecordId, data: Map<String, Value>) -> StoreResult<DynamicRecord>;

    /// Removes a record permanently, soft-deleted or not
    fn delete(&self, id: RecordId) -> StoreResult<()>;

    /// Flags a live record as deleted
    fn soft_delete(&self, id: RecordId) -> StoreResult<DynamicRecord>;

    /// Clears the deleted flag of a soft-deleted record
    fn restore(&self, id: RecordId) -> StoreResult<DynamicRecord>;

    /// Soft-deleted, non-orphaned records of a schema in creation order
    fn list_deleted(&self, schema_id: SchemaId) -> StoreResult<Vec<DynamicRecord>>;

    /// Flags every record of a schema as orphaned; returns how many changed.
    /// Orphaned records stay readable by id but drop out of listings.
    fn mark_orphaned(&self, schema_id: SchemaId) -> StoreResult<usize>;

    /// Number of live records
    fn count(&self) -> StoreResult<usize>;
}
