//! Service layer for dynschema
//!
//! The orchestration a request handler needs: snapshot the schema, validate,
//! then write. A validation rejection becomes `ServiceError::Rejected` only
//! here, on write paths; the validator itself returns it as a value.

mod data;
mod errors;
mod reports;

pub use data::DynamicDataService;
pub use errors::{ServiceError, ServiceResult};
pub use reports::{
    BulkDeleteReport, BulkFailure, BulkUpdateReport, MigrationPlan, MigrationReport,
    RecordUpdate, RecordViolations, RevalidationReport,
};
