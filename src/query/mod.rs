//! Query engine for dynschema
//!
//! Translates `{field, op, value}` predicates into a scan over the records of
//! one schema. Field types come from a schema snapshot and decide how each
//! literal is read: `"20"` filtering an integer field is the number 20, and
//! a fractional literal such as `19.5` is compared numerically against it.
//!
//! # Operators by field type
//!
//! - all types: `eq`, `ne`
//! - integer, number: `lt`, `lte`, `gt`, `gte`
//! - string: `contains`, `startswith`, `endswith`
//! - enum: `in`
//! - array: `contains` (one item)
//! - object: dotted paths (`address.city`) with `eq` / `ne`

mod engine;
mod errors;
mod filter;
mod predicate;
mod sorter;

use std::fmt::Debug;
use std::sync::Arc;

use crate::schema::{Schema, SchemaId, SchemaResult};

pub use engine::{QueryEngine, SearchPage, SearchRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use errors::{QueryError, QueryResult};
pub use filter::Filter;
pub use predicate::{Operator, Predicate};
pub use sorter::{sort_records, SortDirection, SortKey};

/// Source of whole, consistent schema snapshots
pub trait SchemaSource: Send + Sync + Debug {
    fn snapshot(&self, id: SchemaId) -> SchemaResult<Arc<Schema>>;
}
