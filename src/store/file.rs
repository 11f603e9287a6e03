//! File-backed record store
//!
//! State lives in `<dir>/records.log`, an append-only log with one sealed
//! [`Change`] per line. There are no in-place updates: every write appends a
//! full record image (or a tombstone) and syncs before the in-memory table is
//! updated, so a failed append leaves the store unchanged.
//!
//! Opening the store replays the log. Any checksum or parse failure aborts
//! the open with `Corrupted`; a damaged log is never partially loaded.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::checksum::{seal, unseal};
use super::errors::{StoreError, StoreResult};
use super::record::{DynamicRecord, RecordId};
use super::table::{Change, RecordTable};
use super::RecordStore;
use crate::schema::SchemaId;

const LOG_FILE: &str = "records.log";

#[derive(Debug)]
struct LogState {
    table: RecordTable,
    file: File,
}

impl LogState {
    /// Appends and syncs changes, then applies them
    fn commit(&mut self, path: &Path, changes: Vec<Change>) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for change in &changes {
            let json = serde_json::to_string(change)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            buf.push_str(&seal(&json));
            buf.push('\n');
        }

        self.file
            .write_all(buf.as_bytes())
            .map_err(|e| StoreError::io(format!("Failed to append to '{}'", path.display()), e))?;
        self.file
            .sync_data()
            .map_err(|e| StoreError::io(format!("fsync failed on '{}'", path.display()), e))?;

        for change in changes {
            self.table.apply(change);
        }
        Ok(())
    }
}

/// Record store persisted to an append-only, checksummed log
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    state: RwLock<LogState>,
}

impl FileRecordStore {
    /// Opens or creates `<dir>/records.log` and replays it.
    ///
    /// # Errors
    ///
    /// `Io` if the directory or file cannot be opened, `Corrupted` if any
    /// line fails its checksum or does not parse.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            StoreError::io(format!("Failed to create data directory '{}'", dir.display()), e)
        })?;
        let path = dir.join(LOG_FILE);

        let table = if path.exists() {
            Self::replay(&path)?
        } else {
            RecordTable::new()
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(format!("Failed to open '{}'", path.display()), e))?;

        info!(path = %path.display(), records = table.len(), "record store opened");
        Ok(Self {
            path,
            state: RwLock::new(LogState { table, file }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replay(path: &Path) -> StoreResult<RecordTable> {
        let file = File::open(path)
            .map_err(|e| StoreError::io(format!("Failed to open '{}'", path.display()), e))?;

        let mut table = RecordTable::new();
        let mut entries = 0usize;
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line_no = index + 1;
            let line = line
                .map_err(|e| StoreError::io(format!("Failed to read '{}'", path.display()), e))?;
            if line.trim().is_empty() {
                continue;
            }
            let body = unseal(&line).map_err(|reason| StoreError::Corrupted {
                line: line_no,
                reason,
            })?;
            let change: Change = serde_json::from_str(body).map_err(|e| StoreError::Corrupted {
                line: line_no,
                reason: e.to_string(),
            })?;
            table.apply(change);
            entries += 1;
        }
        debug!(entries, "record log replayed");
        Ok(table)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, LogState>> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, LogState>> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }

    /// Computes one image under the write lock and commits it
    fn commit_image<F>(&self, image: F) -> StoreResult<DynamicRecord>
    where
        F: FnOnce(&mut RecordTable) -> StoreResult<DynamicRecord>,
    {
        let mut state = self.write()?;
        let record = image(&mut state.table)?;
        state.commit(&self.path, vec![Change::Image(record.clone())])?;
        Ok(record)
    }
}

impl RecordStore for FileRecordStore {
    fn put(&self, schema_id: SchemaId, data: Map<String, Value>) -> StoreResult<DynamicRecord> {
        let record = self.commit_image(|table| Ok(table.allocate(schema_id, data)))?;
        debug!(record_id = %record.id, schema_id = %schema_id, "record stored");
        Ok(record)
    }

    fn get(&self, id: RecordId) -> StoreResult<DynamicRecord> {
        self.read()?.table.live(id).cloned()
    }

    fn list_by_schema(&self, schema_id: SchemaId) -> StoreResult<Vec<DynamicRecord>> {
        Ok(self.read()?.table.list(schema_id, false))
    }

    fn update(&self, id: RecordId, data: Map<String, Value>) -> StoreResult<DynamicRecord> {
        self.commit_image(|table| table.updated_image(id, data))
    }

    fn delete(&self, id: RecordId) -> StoreResult<()> {
        let mut state = self.write()?;
        state.table.exists(id)?;
        state.commit(&self.path, vec![Change::Tombstone { id }])
    }

    fn soft_delete(&self, id: RecordId) -> StoreResult<DynamicRecord> {
        self.commit_image(|table| table.soft_deleted_image(id))
    }

    fn restore(&self, id: RecordId) -> StoreResult<DynamicRecord> {
        self.commit_image(|table| table.restored_image(id))
    }

    fn list_deleted(&self, schema_id: SchemaId) -> StoreResult<Vec<DynamicRecord>> {
        Ok(self.read()?.table.list(schema_id, true))
    }

    fn mark_orphaned(&self, schema_id: SchemaId) -> StoreResult<usize> {
        let mut state = self.write()?;
        let changes: Vec<Change> = state
            .table
            .orphaned_images(schema_id)
            .into_iter()
            .map(Change::Image)
            .collect();
        let count = changes.len();
        state.commit(&self.path, changes)?;
        Ok(count)
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.read()?.table.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_reopen_replays_log() {
        let dir = TempDir::new().unwrap();
        let (kept, updated, gone, hidden) = {
            let store = FileRecordStore::open(dir.path()).unwrap();
            let kept = store.put(SchemaId(1), data(json!({"n": 1}))).unwrap();
            let updated = store.put(SchemaId(1), data(json!({"n": 2}))).unwrap();
            let gone = store.put(SchemaId(1), data(json!({"n": 3}))).unwrap();
            let hidden = store.put(SchemaId(1), data(json!({"n": 4}))).unwrap();
            store.update(updated.id, data(json!({"n": 20}))).unwrap();
            store.delete(gone.id).unwrap();
            store.soft_delete(hidden.id).unwrap();
            (kept, updated, gone, hidden)
        };

        let store = FileRecordStore::open(dir.path()).unwrap();
        assert_eq!(store.get(kept.id).unwrap().data, kept.data);
        assert_eq!(store.get(updated.id).unwrap().data["n"], 20);
        assert!(store.get(gone.id).unwrap_err().is_not_found());
        assert!(store.get(hidden.id).is_err());
        assert_eq!(store.list_deleted(SchemaId(1)).unwrap()[0].id, hidden.id);

        // Ids are never reused, even after a hard delete of the newest record
        let next = store.put(SchemaId(1), Map::new()).unwrap();
        assert_eq!(next.id, RecordId(hidden.id.0 + 1));
    }

    #[test]
    fn test_orphan_flag_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let id = {
            let store = FileRecordStore::open(dir.path()).unwrap();
            let id = store.put(SchemaId(5), Map::new()).unwrap().id;
            assert_eq!(store.mark_orphaned(SchemaId(5)).unwrap(), 1);
            id
        };
        let store = FileRecordStore::open(dir.path()).unwrap();
        assert!(store.get(id).unwrap().orphaned);
        assert!(store.list_by_schema(SchemaId(5)).unwrap().is_empty());
    }

    #[test]
    fn test_log_lines_are_sealed() {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::open(dir.path()).unwrap();
        store.put(SchemaId(1), data(json!({"a": true}))).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let line = content.lines().next().unwrap();
        let body = unseal(line).unwrap();
        assert!(body.contains(r#""kind":"image""#));
    }

    #[test]
    fn test_corrupted_line_fails_open() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileRecordStore::open(dir.path()).unwrap();
            store.put(SchemaId(1), data(json!({"a": 1}))).unwrap();
            store.put(SchemaId(1), data(json!({"a": 2}))).unwrap();
        }
        let path = dir.path().join(LOG_FILE);
        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace(r#""a":2"#, r#""a":3"#)).unwrap();

        match FileRecordStore::open(dir.path()) {
            Err(StoreError::Corrupted { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corruption, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unparsable_line_fails_open() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LOG_FILE), format!("{}\n", seal("[1,2]"))).unwrap();
        let err = FileRecordStore::open(dir.path()).unwrap_err();
        assert_eq!(err.code(), "DYN_DATA_CORRUPTION");
    }
}
