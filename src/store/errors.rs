//! Record store error types
//!
//! Error codes:
//! - DYN_RECORD_NOT_FOUND (404)
//! - DYN_DATA_CORRUPTION (500)
//! - DYN_STORE_IO_ERROR (500)
//! - DYN_STORE_SERIALIZATION (500)
//! - DYN_STORE_POISONED (500)

use std::io;

use thiserror::Error;

use super::record::RecordId;

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Record store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record {0} not found")]
    RecordNotFound(RecordId),

    /// Checksum or parse failure while replaying the record log
    #[error("Record log corrupted at line {line}: {reason}")]
    Corrupted { line: usize, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Record store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::RecordNotFound(_) => "DYN_RECORD_NOT_FOUND",
            StoreError::Corrupted { .. } => "DYN_DATA_CORRUPTION",
            StoreError::Io { .. } => "DYN_STORE_IO_ERROR",
            StoreError::Serialization(_) => "DYN_STORE_SERIALIZATION",
            StoreError::Poisoned => "DYN_STORE_POISONED",
        }
    }

    /// Get HTTP-style status code
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::RecordNotFound(_) => 404,
            _ => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::RecordNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = StoreError::RecordNotFound(RecordId(9));
        assert_eq!(err.code(), "DYN_RECORD_NOT_FOUND");
        assert_eq!(err.status_code(), 404);
        assert!(err.is_not_found());

        let err = StoreError::Corrupted {
            line: 3,
            reason: "checksum mismatch".into(),
        };
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_io_keeps_context() {
        let err = StoreError::io(
            "Failed to open record log",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.code(), "DYN_STORE_IO_ERROR");
        assert!(err.to_string().starts_with("Failed to open record log"));
    }
}
