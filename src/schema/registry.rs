//! Schema registry: owns every schema and enforces mutation invariants
//!
//! Schemas are held as `Arc<Schema>` snapshots. A mutation clones the current
//! snapshot, edits the clone and swaps it in under the write lock, so a reader
//! only ever sees a whole schema version, never a half-applied field edit.
//!
//! When opened on a directory the registry keeps the `schemas` table in
//! `<dir>/schemas.json`, rewritten (temp file + rename) after every mutation.
//! The file also records the id allocator's high-water mark, so ids of
//! deleted schemas are never handed out again.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::errors::{SchemaError, SchemaResult};
use super::types::{FieldDefinition, FieldSpec, Schema, SchemaId};

const SCHEMA_FILE: &str = "schemas.json";

/// On-disk layout of `schemas.json`
#[derive(Debug, Serialize, Deserialize)]
struct SchemaTable<S> {
    next_id: u64,
    schemas: Vec<S>,
}

/// Registry of runtime-defined schemas
#[derive(Debug)]
pub struct SchemaRegistry {
    /// Schemas by id, in id (creation) order
    schemas: RwLock<BTreeMap<SchemaId, Arc<Schema>>>,
    /// Next id to hand out
    next_id: AtomicU64,
    /// Backing file, `None` for an in-memory registry
    path: Option<PathBuf>,
}

impl SchemaRegistry {
    /// Creates an empty registry with no persistence
    pub fn in_memory() -> Self {
        Self {
            schemas: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            path: None,
        }
    }

    /// Opens the registry stored under `dir`, loading existing schemas.
    pub fn open(dir: &Path) -> SchemaResult<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            SchemaError::Persistence(format!(
                "Failed to create data directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let path = dir.join(SCHEMA_FILE);
        let mut schemas = BTreeMap::new();
        let mut next_id = 1;

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                SchemaError::Persistence(format!("Failed to read '{}': {}", path.display(), e))
            })?;
            let loaded: SchemaTable<Schema> = serde_json::from_str(&content).map_err(|e| {
                SchemaError::Persistence(format!("Invalid schema file '{}': {}", path.display(), e))
            })?;
            next_id = loaded.next_id;

            for schema in loaded.schemas {
                schema.check_unique_names()?;
                let id = schema.id;
                if schemas.insert(id, Arc::new(schema)).is_some() {
                    return Err(SchemaError::Persistence(format!(
                        "Duplicate schema id {} in '{}'",
                        id,
                        path.display()
                    )));
                }
            }
        }

        let next_id = schemas
            .keys()
            .next_back()
            .map_or(next_id, |id: &SchemaId| next_id.max(id.0 + 1));
        info!(path = %path.display(), schemas = schemas.len(), "schema registry opened");

        Ok(Self {
            schemas: RwLock::new(schemas),
            next_id: AtomicU64::new(next_id),
            path: Some(path),
        })
    }

    /// Creates a new schema with a generated id.
    ///
    /// # Errors
    ///
    /// `InvalidSchema` on an empty name, a malformed field or a duplicate
    /// field name.
    pub fn create_schema(
        &self,
        name: impl Into<String>,
        description: Option<String>,
        fields: Vec<FieldSpec>,
    ) -> SchemaResult<Arc<Schema>> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaError::InvalidSchema("schema name must not be empty".into()));
        }

        let fields = fields
            .into_iter()
            .map(FieldDefinition::parse)
            .collect::<SchemaResult<Vec<_>>>()
            .map_err(SchemaError::into_invalid_schema)?;

        let mut schemas = self.write()?;
        let id = SchemaId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let schema = Schema::new(id, name, description, fields);
        schema
            .check_unique_names()
            .map_err(SchemaError::into_invalid_schema)?;

        let schema = Arc::new(schema);
        schemas.insert(id, Arc::clone(&schema));
        if let Err(e) = self.persist(&schemas) {
            schemas.remove(&id);
            return Err(e);
        }

        info!(schema_id = %id, name = %schema.name, fields = schema.fields.len(), "schema created");
        Ok(schema)
    }

    /// Returns a consistent snapshot of the schema.
    pub fn get_schema(&self, id: SchemaId) -> SchemaResult<Arc<Schema>> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or(SchemaError::SchemaNotFound(id))
    }

    /// All schemas in creation order
    pub fn list_schemas(&self) -> SchemaResult<Vec<Arc<Schema>>> {
        Ok(self.read()?.values().cloned().collect())
    }

    /// Replaces name and description. Does not bump the version.
    pub fn update_metadata(
        &self,
        id: SchemaId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> SchemaResult<Arc<Schema>> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaError::InvalidSchema("schema name must not be empty".into()));
        }
        self.mutate(id, false, |schema| {
            schema.name = name;
            schema.description = description;
            Ok(())
        })
    }

    /// Appends a field.
    ///
    /// # Errors
    ///
    /// `InvalidField` if malformed, `DuplicateField` on a name collision.
    pub fn add_field(&self, id: SchemaId, spec: FieldSpec) -> SchemaResult<Arc<Schema>> {
        let def = FieldDefinition::parse(spec)?;
        let field_name = def.name.clone();
        let schema = self.mutate(id, true, |schema| {
            if schema.contains_field(&def.name) {
                return Err(SchemaError::DuplicateField(def.name.clone()));
            }
            schema.fields.push(def);
            Ok(())
        })?;
        info!(schema_id = %id, field = %field_name, version = schema.version, "field added");
        Ok(schema)
    }

    /// Appends several fields; all or nothing.
    pub fn add_fields(&self, id: SchemaId, specs: Vec<FieldSpec>) -> SchemaResult<Arc<Schema>> {
        let defs = specs
            .into_iter()
            .map(FieldDefinition::parse)
            .collect::<SchemaResult<Vec<_>>>()?;
        let count = defs.len();
        let schema = self.mutate(id, true, |schema| {
            for def in defs {
                if schema.contains_field(&def.name) {
                    return Err(SchemaError::DuplicateField(def.name));
                }
                schema.fields.push(def);
            }
            Ok(())
        })?;
        info!(schema_id = %id, added = count, version = schema.version, "fields added");
        Ok(schema)
    }

    /// Replaces an existing field in place.
    ///
    /// The new definition may carry a different name (rename); it keeps the
    /// old field's position. Existing records are not re-validated.
    pub fn update_field(
        &self,
        id: SchemaId,
        field_name: &str,
        spec: FieldSpec,
    ) -> SchemaResult<Arc<Schema>> {
        let def = FieldDefinition::parse(spec)?;
        let new_name = def.name.clone();
        let schema = self.mutate(id, true, |schema| {
            let pos = schema.position(field_name).ok_or_else(|| SchemaError::FieldNotFound {
                schema_id: id,
                field: field_name.to_string(),
            })?;
            if def.name != field_name && schema.contains_field(&def.name) {
                return Err(SchemaError::DuplicateField(def.name.clone()));
            }
            schema.fields[pos] = def;
            Ok(())
        })?;
        info!(schema_id = %id, field = %field_name, new_name = %new_name, version = schema.version, "field updated");
        Ok(schema)
    }

    /// Removes a field. Stored records keep the now-unknown key.
    pub fn remove_field(&self, id: SchemaId, field_name: &str) -> SchemaResult<Arc<Schema>> {
        let schema = self.mutate(id, true, |schema| {
            let pos = schema.position(field_name).ok_or_else(|| SchemaError::FieldNotFound {
                schema_id: id,
                field: field_name.to_string(),
            })?;
            schema.fields.remove(pos);
            Ok(())
        })?;
        info!(schema_id = %id, field = %field_name, version = schema.version, "field removed");
        Ok(schema)
    }

    /// Checks a field definition against the schema without applying it.
    pub fn check_field(&self, id: SchemaId, spec: FieldSpec) -> SchemaResult<FieldDefinition> {
        let schema = self.get_schema(id)?;
        let def = FieldDefinition::parse(spec)?;
        if schema.contains_field(&def.name) {
            return Err(SchemaError::DuplicateField(def.name));
        }
        Ok(def)
    }

    /// Removes a schema and returns its last snapshot.
    ///
    /// Records are not touched here; the caller decides what happens to them.
    pub fn delete_schema(&self, id: SchemaId) -> SchemaResult<Arc<Schema>> {
        let mut schemas = self.write()?;
        let removed = schemas.remove(&id).ok_or(SchemaError::SchemaNotFound(id))?;
        if let Err(e) = self.persist(&schemas) {
            schemas.insert(id, removed);
            return Err(e);
        }
        info!(schema_id = %id, name = %removed.name, "schema deleted");
        Ok(removed)
    }

    pub fn len(&self) -> SchemaResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> SchemaResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Applies `edit` to a copy of the schema and swaps the copy in.
    fn mutate<F>(&self, id: SchemaId, bump_version: bool, edit: F) -> SchemaResult<Arc<Schema>>
    where
        F: FnOnce(&mut Schema) -> SchemaResult<()>,
    {
        let mut schemas = self.write()?;
        let current = schemas.get(&id).ok_or(SchemaError::SchemaNotFound(id))?;

        let mut next = Schema::clone(current);
        edit(&mut next)?;
        if bump_version {
            next.version += 1;
        }
        next.updated_at = Utc::now();

        let next = Arc::new(next);
        let previous = schemas.insert(id, Arc::clone(&next));
        if let Err(e) = self.persist(&schemas) {
            if let Some(previous) = previous {
                schemas.insert(id, previous);
            }
            return Err(e);
        }
        Ok(next)
    }

    /// Rewrites the schema table. Called with the write lock held.
    fn persist(&self, schemas: &BTreeMap<SchemaId, Arc<Schema>>) -> SchemaResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let table = SchemaTable {
            next_id: self.next_id.load(Ordering::SeqCst),
            schemas: schemas.values().map(|s| s.as_ref()).collect::<Vec<&Schema>>(),
        };
        let content = serde_json::to_string_pretty(&table)
            .map_err(|e| SchemaError::Persistence(format!("Failed to serialize schemas: {}", e)))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| {
            SchemaError::Persistence(format!("Failed to write '{}': {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, path).map_err(|e| {
            SchemaError::Persistence(format!("Failed to replace '{}': {}", path.display(), e))
        })
    }

    fn read(&self) -> SchemaResult<RwLockReadGuard<'_, BTreeMap<SchemaId, Arc<Schema>>>> {
        self.schemas
            .read()
            .map_err(|_| SchemaError::Persistence("schema registry lock poisoned".into()))
    }

    fn write(&self) -> SchemaResult<RwLockWriteGuard<'_, BTreeMap<SchemaId, Arc<Schema>>>> {
        self.schemas
            .write()
            .map_err(|_| SchemaError::Persistence("schema registry lock poisoned".into()))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::in_memory()
    }
}

// Implement the query engine's SchemaSource trait
impl crate::query::SchemaSource for SchemaRegistry {
    fn snapshot(&self, id: SchemaId) -> SchemaResult<Arc<Schema>> {
        self.get_schema(id)
    }
}
