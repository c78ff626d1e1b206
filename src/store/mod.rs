//! Store gateway: the document store the engine reads from and writes to.
//!
//! The engine only ever talks to a [`StoreGateway`] trait object handed to it at construction
//! time. [`MemoryStore`] is the in-process implementation; any backend that can evaluate the
//! [`Stage`]s below (match, sort, skip, limit, exclude, group-first, date-to-string) can stand in.

mod filter;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Document;

pub use filter::{CompiledFilter, Filter, SortOrder};
pub use memory::MemoryStore;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed the call.
    #[error("{0}")]
    Backend(String),

    /// A predicate could not be evaluated (e.g. an invalid pattern).
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    /// In-process state was left inconsistent by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result type for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// One step of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep documents matching the filter.
    Match(Filter),
    /// Stable sort by the listed keys, in priority order.
    Sort(Vec<(String, SortOrder)>),
    /// Drop the first `n` documents.
    Skip(usize),
    /// Keep at most `n` documents.
    Limit(usize),
    /// Remove the listed fields from every document.
    Exclude(Vec<String>),
    /// Group by `by`; each output document has `key_as` set to the group key and, for every
    /// `(output, source)` pair in `first`, the value of `source` in the group's first document.
    GroupFirst {
        by: String,
        key_as: String,
        first: Vec<(String, String)>,
    },
    /// Replace a date field with its `strftime`-formatted string. Non-dates become `""`.
    DateToString { field: String, format: String },
}

/// Store operations the engine consumes.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Append documents. Either all are written or an error is returned.
    async fn insert_many(&self, docs: Vec<Document>) -> StoreResult<()>;

    /// First document matching `filter`, if any.
    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Number of documents matching `filter`.
    async fn count(&self, filter: &Filter) -> StoreResult<u64>;

    /// Run an aggregation pipeline, returning at most `limit` documents when set.
    async fn aggregate(&self, pipeline: &[Stage], limit: Option<usize>) -> StoreResult<Vec<Document>>;

    /// Delete every document matching `filter`, returning how many were removed.
    async fn delete_many(&self, filter: &Filter) -> StoreResult<u64>;

    /// Whether the backend is reachable.
    async fn health_check(&self) -> StoreResult<bool>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
