//! dynschema - runtime-defined schemas with validated records and typed queries
//!
//! Schemas are created and evolved while the process runs. Every record
//! write is validated against the schema version current at that moment,
//! and queries coerce their operands by the declared field types.
//!
//! - `schema`: registry, field types and the validator
//! - `store`: record persistence (in memory or an append-only log)
//! - `query`: predicate compilation, sorting and pagination
//! - `service`: the record lifecycle tying the three together
//! - `api` / `cli`: JSON request handling over stdin/stdout

pub mod api;
pub mod cli;
pub mod config;
pub mod query;
pub mod schema;
pub mod service;
pub mod store;
