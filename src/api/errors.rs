//! API error types
//!
//! Error codes:
//! - DYN_INVALID_REQUEST (400)
//! - DYN_INTERNAL (500)
//! - every service error code, passed through unchanged

use thiserror::Error;

use crate::query::QueryError;
use crate::schema::{SchemaError, Violation};
use crate::service::ServiceError;
use crate::store::StoreError;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be parsed or names an unknown op
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ApiError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        ApiError::InvalidRequest(reason.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "DYN_INVALID_REQUEST",
            ApiError::Internal(_) => "DYN_INTERNAL",
            ApiError::Service(e) => e.code(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) => 400,
            ApiError::Internal(_) => 500,
            ApiError::Service(e) => e.status_code(),
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ApiError::Service(e) => e.violations().unwrap_or(&[]),
            _ => &[],
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::Service(err.into())
    }
}
