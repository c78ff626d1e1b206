//! Read-side queries over stored records, plus delete-by-filename.
//!
//! Every query is built as a store [`Stage`] pipeline and executed through the injected
//! [`StoreGateway`]. Returned records have their date-bearing columns rendered as `YYYY-MM-DD`
//! strings (or `""`), and never expose `Filename`/`Upload_date` values.
//!
//! - [`QueryEngine::list`]: flat listing of every record, newest `RptDt` first
//! - [`QueryEngine::distinct_files`]: one entry per upload matching a field
//! - [`QueryEngine::paginate_by_files`] / [`QueryEngine::filter_all_by_files`]: per-file records
//! - [`QueryEngine::filter_by_fields`]: listing restricted by a [`FilterSet`]
//! - [`QueryEngine::list_distinct_uploads`]: upload history
//! - [`QueryEngine::delete_by_filename`]

mod fields;
mod files;
mod pagination;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::dates::render_document;
use crate::error::{EngineError, EngineResult};
use crate::store::{Filter, SortOrder, Stage, StoreGateway};
use crate::types::{Document, FILENAME_FIELD, REPORT_DATE_FIELD, UPLOAD_DATE_FIELD};

pub use fields::{FieldsResponse, FilterSet};
pub use files::{FileEntry, FileQueryOptions, FilesResponse, Search, UploadHistory};
pub use pagination::Pagination;

/// One page of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPage {
    /// The requested page, 1-based.
    pub current_page: u64,
    /// `ceil(matching / page_size)`; `0` when nothing matches.
    pub total_pages: u64,
    pub page_size: u64,
    /// Records on this page, rendered for output.
    pub data: Vec<Document>,
}

/// Outcome of a delete-by-filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReceipt {
    pub filename: String,
    /// Number of records removed.
    pub deleted: u64,
}

/// Query engine over the injected store.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn StoreGateway>,
}

impl QueryEngine {
    /// Create a query engine reading from `store`.
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }

    /// Every record, newest `RptDt` first, one page at a time.
    pub async fn list(&self, page: u64, page_size: u64) -> EngineResult<RecordPage> {
        let p = Pagination::new(page, page_size)?;
        let (data, total_pages) = self.fetch_records(Filter::All, Some(p)).await?;
        Ok(RecordPage {
            current_page: p.page(),
            total_pages: total_pages.unwrap_or_default(),
            page_size: p.page_size(),
            data,
        })
    }

    /// Remove every record stored under `filename`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if nothing is stored under that name, including when a concurrent
    /// delete removed the records between the existence check and the delete.
    pub async fn delete_by_filename(&self, filename: &str) -> EngineResult<DeleteReceipt> {
        let by_name = Filter::equals(FILENAME_FIELD, filename);
        let not_found = || EngineError::NotFound {
            filename: filename.to_owned(),
        };

        if self.store.find_one(&by_name).await?.is_none() {
            return Err(not_found());
        }
        let deleted = self.store.delete_many(&by_name).await?;
        if deleted == 0 {
            return Err(not_found());
        }

        info!(filename = %filename, deleted, "Deleted upload");
        Ok(DeleteReceipt {
            filename: filename.to_owned(),
            deleted,
        })
    }

    /// Records matching `filter`, sorted by `RptDt` descending and rendered for output.
    ///
    /// With a page, only that page is fetched and the matching total is counted to compute
    /// `total_pages`; without one every match is returned.
    async fn fetch_records(&self, filter: Filter, page: Option<Pagination>) -> EngineResult<(Vec<Document>, Option<u64>)> {
        let mut pipeline = Vec::with_capacity(5);
        if filter != Filter::All {
            pipeline.push(Stage::Match(filter.clone()));
        }
        pipeline.push(Stage::Sort(vec![(
            REPORT_DATE_FIELD.to_owned(),
            SortOrder::Descending,
        )]));
        if let Some(p) = page {
            pipeline.push(Stage::Skip(p.skip()));
            pipeline.push(Stage::Limit(p.limit()));
        }
        pipeline.push(Stage::Exclude(vec![
            FILENAME_FIELD.to_owned(),
            UPLOAD_DATE_FIELD.to_owned(),
        ]));

        let docs = self
            .store
            .aggregate(&pipeline, page.map(|p| p.limit()))
            .await?;
        let data: Vec<Document> = docs.into_iter().map(render_document).collect();

        let total_pages = match page {
            Some(p) => Some(p.total_pages(self.store.count(&filter).await?)),
            None => None,
        };
        debug!(returned = data.len(), ?total_pages, "Fetched records");
        Ok((data, total_pages))
    }
}
