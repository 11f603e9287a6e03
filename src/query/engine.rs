//! Query execution over the record store

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::{QueryError, QueryResult};
use super::filter::Filter;
use super::predicate::Predicate;
use super::sorter::{sort_records, SortKey};
use super::SchemaSource;
use crate::schema::{FieldType, Schema, SchemaId};
use crate::store::{DynamicRecord, RecordStore};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Filter, sort, page and project in one call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default, alias = "filters")]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub sort: Vec<SortKey>,
    /// 1-based page number, default 1
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default, alias = "page_size")]
    pub page_size: Option<usize>,
    /// Keys to keep in each returned record's data
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// Matches across all pages
    pub total: usize,
    pub items: Vec<DynamicRecord>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Type-aware filtering of the records of one schema.
///
/// Results come back in creation order unless a search asks for a sort.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    schemas: Arc<dyn SchemaSource>,
    store: Arc<dyn RecordStore>,
    default_page_size: usize,
    max_page_size: usize,
}

impl QueryEngine {
    pub fn new(schemas: Arc<dyn SchemaSource>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            schemas,
            store,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    pub fn with_page_limits(mut self, default_page_size: usize, max_page_size: usize) -> Self {
        self.default_page_size = default_page_size;
        self.max_page_size = max_page_size;
        self
    }

    /// Returns the live records of a schema matching every predicate.
    ///
    /// # Errors
    ///
    /// `Schema(SchemaNotFound)` for an unknown schema, or any compile error
    /// from [`Filter::compile`].
    pub fn query(&self, schema_id: SchemaId, predicates: &[Predicate]) -> QueryResult<Vec<DynamicRecord>> {
        let schema = self.schemas.snapshot(schema_id)?;
        let filter = Filter::compile(&schema, predicates)?;
        self.scan(&schema, &filter)
    }

    pub fn search(&self, schema_id: SchemaId, request: &SearchRequest) -> QueryResult<SearchPage> {
        let schema = self.schemas.snapshot(schema_id)?;
        let filter = Filter::compile(&schema, &request.predicates)?;

        for key in &request.sort {
            check_path(&schema, &key.field)?;
        }
        if let Some(fields) = &request.fields {
            for field in fields {
                if !schema.contains_field(field) {
                    return Err(QueryError::UnknownField {
                        schema_id,
                        field: field.clone(),
                    });
                }
            }
        }

        let page = request.page.unwrap_or(1);
        if page == 0 {
            return Err(QueryError::InvalidPagination("page starts at 1".into()));
        }
        let page_size = request.page_size.unwrap_or(self.default_page_size);
        if page_size == 0 {
            return Err(QueryError::InvalidPagination("page size must be positive".into()));
        }
        let page_size = page_size.min(self.max_page_size);

        let mut matched = self.scan(&schema, &filter)?;
        sort_records(&mut matched, &request.sort);

        let total = matched.len();
        let total_pages = total.div_ceil(page_size);
        let items = matched
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .map(|record| match &request.fields {
                Some(fields) => record.project(fields),
                None => record,
            })
            .collect();

        Ok(SearchPage {
            total,
            items,
            page,
            page_size,
            total_pages,
        })
    }

    fn scan(&self, schema: &Schema, filter: &Filter) -> QueryResult<Vec<DynamicRecord>> {
        let records = self.store.list_by_schema(schema.id)?;
        let scanned = records.len();
        let matched: Vec<DynamicRecord> = records.into_iter().filter(|r| filter.matches(r)).collect();
        debug!(
            schema_id = %schema.id,
            predicates = filter.len(),
            scanned,
            matched = matched.len(),
            "query executed"
        );
        Ok(matched)
    }
}

/// A field, or a dotted path whose head is an object field
fn check_path(schema: &Schema, path: &str) -> QueryResult<()> {
    if schema.contains_field(path) {
        return Ok(());
    }
    let nested_ok = path
        .split_once('.')
        .and_then(|(head, _)| schema.field(head))
        .map(|def| def.field_type == FieldType::Object)
        .unwrap_or(false);
    if nested_ok {
        Ok(())
    } else {
        Err(QueryError::UnknownField {
            schema_id: schema.id,
            field: path.to_string(),
        })
    }
}
