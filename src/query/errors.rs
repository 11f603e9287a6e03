//! Query error types
//!
//! Error codes:
//! - DYN_UNKNOWN_FIELD (400)
//! - DYN_INCOMPATIBLE_OPERATOR (400)
//! - DYN_INVALID_OPERAND (400)
//! - DYN_INVALID_PAGINATION (400)
//! - schema and store errors keep their own codes

use thiserror::Error;

use super::predicate::Operator;
use crate::schema::{SchemaError, SchemaId};
use crate::store::StoreError;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query engine errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// Predicate, sort key or projection names a field the schema lacks
    #[error("Field '{field}' is not defined in schema {schema_id}")]
    UnknownField { schema_id: SchemaId, field: String },

    #[error("Operator '{operator}' cannot be applied to {field_type} field '{field}'")]
    IncompatibleOperator {
        field: String,
        operator: Operator,
        field_type: &'static str,
    },

    /// Literal cannot be read as a value of the field's type
    #[error("Invalid operand for field '{field}': {reason}")]
    InvalidOperand { field: String, reason: String },

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::UnknownField { .. } => "DYN_UNKNOWN_FIELD",
            QueryError::IncompatibleOperator { .. } => "DYN_INCOMPATIBLE_OPERATOR",
            QueryError::InvalidOperand { .. } => "DYN_INVALID_OPERAND",
            QueryError::InvalidPagination(_) => "DYN_INVALID_PAGINATION",
            QueryError::Schema(e) => e.code(),
            QueryError::Store(e) => e.code(),
        }
    }

    /// Get HTTP-style status code
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::Schema(e) => e.status_code(),
            QueryError::Store(e) => e.status_code(),
            _ => 400,
        }
    }

    pub(crate) fn operand(field: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidOperand {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
