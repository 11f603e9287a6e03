//! Schema error types
//!
//! Error codes:
//! - DYN_INVALID_SCHEMA (400)
//! - DYN_INVALID_FIELD (400)
//! - DYN_DUPLICATE_FIELD (409)
//! - DYN_SCHEMA_NOT_FOUND (404)
//! - DYN_FIELD_NOT_FOUND (404)
//! - DYN_SCHEMA_PERSISTENCE (500)
//!
//! All of these are definitional failures: reported immediately, never retried.

use thiserror::Error;

use super::types::SchemaId;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema registry errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Schema definition is malformed as a whole
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A single field definition is malformed
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// Field name collides with an existing field
    #[error("Field '{0}' already exists")]
    DuplicateField(String),

    #[error("Schema {0} not found")]
    SchemaNotFound(SchemaId),

    #[error("Field '{field}' not found in schema {schema_id}")]
    FieldNotFound { schema_id: SchemaId, field: String },

    /// Schema table could not be read or written
    #[error("Schema persistence failed: {0}")]
    Persistence(String),
}

impl SchemaError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::InvalidSchema(_) => "DYN_INVALID_SCHEMA",
            SchemaError::InvalidField { .. } => "DYN_INVALID_FIELD",
            SchemaError::DuplicateField(_) => "DYN_DUPLICATE_FIELD",
            SchemaError::SchemaNotFound(_) => "DYN_SCHEMA_NOT_FOUND",
            SchemaError::FieldNotFound { .. } => "DYN_FIELD_NOT_FOUND",
            SchemaError::Persistence(_) => "DYN_SCHEMA_PERSISTENCE",
        }
    }

    /// Get HTTP-style status code
    pub fn status_code(&self) -> u16 {
        match self {
            SchemaError::InvalidSchema(_) | SchemaError::InvalidField { .. } => 400,
            SchemaError::DuplicateField(_) => 409,
            SchemaError::SchemaNotFound(_) | SchemaError::FieldNotFound { .. } => 404,
            SchemaError::Persistence(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }

    /// Re-labels a field-level failure as a schema-level one (used by create).
    pub(crate) fn into_invalid_schema(self) -> Self {
        match self {
            SchemaError::InvalidSchema(_) => self,
            other => SchemaError::InvalidSchema(other.to_string()),
        }
    }
}
