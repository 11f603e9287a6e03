//! API layer for dynschema
//!
//! Thin request/response glue over the service: JSON requests tagged by `op`
//! in, `{"status": "ok" | "error", ...}` envelopes out. Transport is left to
//! the caller; the CLI feeds it stdin lines.
//!
//! # Design Principles
//!
//! - Error codes passed through unchanged
//! - Validation violations returned verbatim
//! - Every request runs in a span with its request id

mod errors;
mod handler;
mod request;
mod response;

pub use errors::{ApiError, ApiResult};
pub use handler::ApiHandler;
pub use request::Request;
pub use response::Response;
