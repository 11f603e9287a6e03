//! Service error types
//!
//! Error codes:
//! - DYN_VALIDATION_FAILED (422), carries every violation
//! - DYN_RECORD_ORPHANED (409)
//! - schema, store and query errors keep their own codes

use thiserror::Error;

use crate::query::QueryError;
use crate::schema::{SchemaError, SchemaId, Violation};
use crate::store::{RecordId, StoreError};

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// Write refused because the payload did not validate
    #[error("Payload rejected with {} violation(s)", .0.len())]
    Rejected(Vec<Violation>),

    /// Record belongs to a schema that no longer exists
    #[error("Record {record_id} is orphaned: schema {schema_id} was deleted")]
    Orphaned {
        record_id: RecordId,
        schema_id: SchemaId,
    },
}

impl ServiceError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Schema(e) => e.code(),
            ServiceError::Store(e) => e.code(),
            ServiceError::Query(e) => e.code(),
            ServiceError::Rejected(_) => "DYN_VALIDATION_FAILED",
            ServiceError::Orphaned { .. } => "DYN_RECORD_ORPHANED",
        }
    }

    /// Get HTTP-style status code
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Schema(e) => e.status_code(),
            ServiceError::Store(e) => e.status_code(),
            ServiceError::Query(e) => e.status_code(),
            ServiceError::Rejected(_) => 422,
            ServiceError::Orphaned { .. } => 409,
        }
    }

    /// Violations of a rejected write
    pub fn violations(&self) -> Option<&[Violation]> {
        match self {
            ServiceError::Rejected(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_carries_violations() {
        let err = ServiceError::Rejected(vec![Violation::missing("age"), Violation::unknown("x")]);
        assert_eq!(err.code(), "DYN_VALIDATION_FAILED");
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.violations().map(|v| v.len()), Some(2));
        assert_eq!(err.to_string(), "Payload rejected with 2 violation(s)");
    }

    #[test]
    fn test_not_found_passes_through() {
        let err: ServiceError = StoreError::RecordNotFound(RecordId(1)).into();
        assert!(err.is_not_found());
        assert_eq!(err.code(), "DYN_RECORD_NOT_FOUND");
    }
}
