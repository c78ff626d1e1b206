//! Per-upload queries: distinct-file lookups, per-file record fan-out and the upload history.

use serde::Serialize;

use crate::dates::format_for_query;
use crate::error::EngineResult;
use crate::store::{Filter, SortOrder, Stage};
use crate::types::{Document, Value, FILENAME_FIELD, UPLOAD_DATE_FIELD};

use super::{Pagination, QueryEngine};

const GROUP_FILENAME: &str = "filename";
const GROUP_UPLOAD_DATE: &str = "upload_date";

/// One upload, optionally with its records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    /// Name the upload was stored under.
    pub filename: String,
    /// Most recent upload day for this name, `YYYY-MM-DD`.
    pub upload_date: String,
    /// Page count for this file's records; set by per-file pagination only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    /// This file's records, when content was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Document>>,
}

impl FileEntry {
    fn from_group(doc: &Document) -> Self {
        let text = |key: &str| {
            doc.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        Self {
            filename: text(GROUP_FILENAME),
            upload_date: text(GROUP_UPLOAD_DATE),
            total_pages: None,
            data: None,
        }
    }
}

/// Echo of the lookup that produced a [`FilesResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Search {
    /// Serialized as `"filename_search": <value>`.
    FilenameSearch(String),
    /// Serialized as `"upload_date_search": <value>`.
    UploadDateSearch(String),
}

/// Result of a per-upload query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilesResponse {
    /// Number of entries in `result`.
    pub files_found: usize,
    /// Present when records were paginated per file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    /// Flattened into the response as `filename_search` or `upload_date_search`.
    #[serde(flatten)]
    pub search: Option<Search>,
    pub result: Vec<FileEntry>,
}

impl FilesResponse {
    fn lookup_only(result: Vec<FileEntry>) -> Self {
        Self {
            files_found: result.len(),
            current_page: None,
            page_size: None,
            search: None,
            result,
        }
    }

    fn with_search(mut self, search: Search) -> Self {
        self.search = Some(search);
        self
    }
}

/// One page of the upload history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadHistory {
    pub current_page: u64,
    /// Pages over distinct uploads, not over records.
    pub total_pages: u64,
    pub page_size: u64,
    /// Number of distinct uploads overall.
    pub files_found: u64,
    /// Uploads on this page, newest first.
    pub data: Vec<FileEntry>,
}

/// Routing flags shared by the compound getters.
///
/// | `include_content` | `paginate` | behavior |
/// |---|---|---|
/// | false | any | distinct-files lookup only |
/// | true | true | per-file pagination |
/// | true | false | every record per file |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileQueryOptions {
    /// Attach each file's records instead of returning the lookup alone.
    pub include_content: bool,
    /// With content, return one page per file rather than every record.
    pub paginate: bool,
    /// 1-based page, used when paginating.
    pub page: u64,
    pub page_size: u64,
}

impl Default for FileQueryOptions {
    fn default() -> Self {
        Self {
            include_content: false,
            paginate: true,
            page: 1,
            page_size: 10,
        }
    }
}

/// Most recent upload date per filename, newest first, rendered as `YYYY-MM-DD`.
fn grouped_by_filename() -> Vec<Stage> {
    vec![
        Stage::Sort(vec![(UPLOAD_DATE_FIELD.to_owned(), SortOrder::Descending)]),
        Stage::GroupFirst {
            by: FILENAME_FIELD.to_owned(),
            key_as: GROUP_FILENAME.to_owned(),
            first: vec![(GROUP_UPLOAD_DATE.to_owned(), UPLOAD_DATE_FIELD.to_owned())],
        },
        Stage::Sort(vec![
            (GROUP_UPLOAD_DATE.to_owned(), SortOrder::Descending),
            (GROUP_FILENAME.to_owned(), SortOrder::Ascending),
        ]),
    ]
}

fn render_upload_date() -> Stage {
    Stage::DateToString {
        field: GROUP_UPLOAD_DATE.to_owned(),
        format: "%Y-%m-%d".to_owned(),
    }
}

impl QueryEngine {
    /// One entry per upload whose records match `search_field`.
    ///
    /// With `exact_match` the field must equal the value (date columns are compared as dates when
    /// the value parses as one). Otherwise the value is a case-insensitive literal prefix.
    pub async fn distinct_files(&self, search_field: &str, value: &str, exact_match: bool) -> EngineResult<Vec<FileEntry>> {
        let filter = if exact_match {
            Filter::Eq {
                field: search_field.to_owned(),
                value: format_for_query(search_field, value),
            }
        } else {
            Filter::prefix(search_field, value)
        };

        let mut pipeline = vec![Stage::Match(filter)];
        pipeline.extend(grouped_by_filename());
        pipeline.push(render_upload_date());

        let groups = self.store.aggregate(&pipeline, None).await?;
        Ok(groups.iter().map(FileEntry::from_group).collect())
    }

    /// Attach one page of records (and that file's page count) to every entry.
    pub async fn paginate_by_files(&self, files: Vec<FileEntry>, page: u64, page_size: u64) -> EngineResult<FilesResponse> {
        let p = Pagination::new(page, page_size)?;
        let mut result = Vec::with_capacity(files.len());
        for mut file in files {
            let (data, total_pages) = self
                .fetch_records(Filter::equals(FILENAME_FIELD, file.filename.as_str()), Some(p))
                .await?;
            file.total_pages = total_pages;
            file.data = Some(data);
            result.push(file);
        }

        Ok(FilesResponse {
            files_found: result.len(),
            current_page: Some(p.page()),
            page_size: Some(p.page_size()),
            search: None,
            result,
        })
    }

    /// Attach every record to every entry.
    pub async fn filter_all_by_files(&self, files: Vec<FileEntry>) -> EngineResult<FilesResponse> {
        let mut result = Vec::with_capacity(files.len());
        for mut file in files {
            let (data, _) = self
                .fetch_records(Filter::equals(FILENAME_FIELD, file.filename.as_str()), None)
                .await?;
            file.data = Some(data);
            result.push(file);
        }
        Ok(FilesResponse::lookup_only(result))
    }

    /// Every upload ever ingested, newest first, paginated over uploads rather than records.
    pub async fn list_distinct_uploads(&self, page: u64, page_size: u64) -> EngineResult<UploadHistory> {
        let p = Pagination::new(page, page_size)?;

        let total = self.store.aggregate(&grouped_by_filename(), None).await?.len() as u64;

        let mut pipeline = grouped_by_filename();
        pipeline.push(Stage::Skip(p.skip()));
        pipeline.push(Stage::Limit(p.limit()));
        pipeline.push(render_upload_date());
        let groups = self.store.aggregate(&pipeline, Some(p.limit())).await?;

        Ok(UploadHistory {
            current_page: p.page(),
            total_pages: p.total_pages(total),
            page_size: p.page_size(),
            files_found: total,
            data: groups.iter().map(FileEntry::from_group).collect(),
        })
    }

    /// Uploads whose name matches `filename` (exactly, or as a prefix), routed by `opts`.
    pub async fn get_files_by_name(&self, filename: &str, exact_match: bool, opts: FileQueryOptions) -> EngineResult<FilesResponse> {
        let files = self.distinct_files(FILENAME_FIELD, filename, exact_match).await?;
        let response = self.route(files, opts).await?;
        Ok(response.with_search(Search::FilenameSearch(filename.to_owned())))
    }

    /// Uploads ingested on `upload_date` (`YYYY-MM-DD` or `DD/MM/YYYY`), routed by `opts`.
    pub async fn get_files_by_upload_date(&self, upload_date: &str, opts: FileQueryOptions) -> EngineResult<FilesResponse> {
        let files = self.distinct_files(UPLOAD_DATE_FIELD, upload_date, true).await?;
        let response = self.route(files, opts).await?;
        Ok(response.with_search(Search::UploadDateSearch(upload_date.to_owned())))
    }

    async fn route(&self, files: Vec<FileEntry>, opts: FileQueryOptions) -> EngineResult<FilesResponse> {
        match (opts.include_content, opts.paginate) {
            (false, _) => Ok(FilesResponse::lookup_only(files)),
            (true, true) => self.paginate_by_files(files, opts.page, opts.page_size).await,
            (true, false) => self.filter_all_by_files(files).await,
        }
    }
}
