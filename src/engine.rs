//! Facade wiring a store, the ingestion pipeline and the query engine together.

use std::sync::Arc;

use config::ConfigError;
use tracing::{error, info};

use crate::config::Settings;
use crate::error::EngineResult;
use crate::ingestion::{IngestionObserver, TracingObserver};
use crate::pipeline::{IngestOptions, Ingestor, UploadReceipt};
use crate::query::{
    DeleteReceipt, FieldsResponse, FileEntry, FileQueryOptions, FilesResponse, FilterSet,
    QueryEngine, RecordPage, UploadHistory,
};
use crate::store::{MemoryStore, StoreError, StoreGateway};

/// Everything an outer layer needs: ingestion, queries and deletion over one store.
pub struct Engine {
    store: Arc<dyn StoreGateway>,
    ingestor: Ingestor,
    query: QueryEngine,
    default_page_size: u64,
}

impl Engine {
    /// Build an engine over `store`, reporting ingestion outcomes through [`TracingObserver`].
    pub fn new(store: Arc<dyn StoreGateway>, settings: &Settings) -> Result<Self, ConfigError> {
        Self::with_observer(store, settings, Arc::new(TracingObserver))
    }

    /// Build an engine with a custom ingestion observer.
    pub fn with_observer(
        store: Arc<dyn StoreGateway>,
        settings: &Settings,
        observer: Arc<dyn IngestionObserver>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let opts = IngestOptions::from_settings(&settings.ingest)?;
        Ok(Self {
            ingestor: Ingestor::new(Arc::clone(&store), opts).with_observer(observer),
            query: QueryEngine::new(Arc::clone(&store)),
            store,
            default_page_size: settings.query.default_page_size,
        })
    }

    /// Build an engine over a fresh [`MemoryStore`] named after `settings.collection`.
    pub fn in_memory(settings: &Settings) -> Result<Self, ConfigError> {
        Self::new(Arc::new(MemoryStore::new(settings.collection.clone())), settings)
    }

    /// Check that the store is reachable before serving requests.
    pub async fn startup(&self) -> EngineResult<()> {
        let backend = self.store.name();
        match self.store.health_check().await {
            Ok(true) => {
                info!(backend, "Store is healthy");
                Ok(())
            }
            Ok(false) => {
                error!(backend, "Store health check failed");
                Err(StoreError::Backend(format!("{backend} is not reachable")).into())
            }
            Err(e) => {
                error!(backend, error = %e, "Store health check errored");
                Err(e.into())
            }
        }
    }

    /// The injected store.
    pub fn store(&self) -> &Arc<dyn StoreGateway> {
        &self.store
    }

    /// The ingestion pipeline, for callers that need `ingest_at` or custom options.
    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// The read side.
    pub fn query(&self) -> &QueryEngine {
        &self.query
    }

    /// Page size from [`crate::config::QuerySettings`].
    pub fn default_page_size(&self) -> u64 {
        self.default_page_size
    }

    /// Routing flags with the configured default page size.
    pub fn default_file_options(&self) -> FileQueryOptions {
        FileQueryOptions {
            page_size: self.default_page_size,
            ..FileQueryOptions::default()
        }
    }

    /// Ingest one upload. See [`Ingestor::ingest`].
    pub async fn ingest(&self, filename: &str, content_type: &str, bytes: Vec<u8>) -> EngineResult<UploadReceipt> {
        self.ingestor.ingest(filename, content_type, bytes).await
    }

    /// See [`QueryEngine::list`].
    pub async fn list(&self, page: u64, page_size: u64) -> EngineResult<RecordPage> {
        self.query.list(page, page_size).await
    }

    /// See [`QueryEngine::distinct_files`].
    pub async fn distinct_files(&self, search_field: &str, value: &str, exact_match: bool) -> EngineResult<Vec<FileEntry>> {
        self.query.distinct_files(search_field, value, exact_match).await
    }

    /// See [`QueryEngine::paginate_by_files`].
    pub async fn paginate_by_files(&self, files: Vec<FileEntry>, page: u64, page_size: u64) -> EngineResult<FilesResponse> {
        self.query.paginate_by_files(files, page, page_size).await
    }

    /// See [`QueryEngine::filter_all_by_files`].
    pub async fn filter_all_by_files(&self, files: Vec<FileEntry>) -> EngineResult<FilesResponse> {
        self.query.filter_all_by_files(files).await
    }

    /// See [`QueryEngine::filter_by_fields`].
    pub async fn filter_by_fields(&self, fields: &FilterSet, page: u64, page_size: u64, paginate: bool) -> EngineResult<FieldsResponse> {
        self.query.filter_by_fields(fields, page, page_size, paginate).await
    }

    /// Upload history. See [`QueryEngine::list_distinct_uploads`].
    pub async fn list_distinct_uploads(&self, page: u64, page_size: u64) -> EngineResult<UploadHistory> {
        self.query.list_distinct_uploads(page, page_size).await
    }

    /// Remove every record of an upload, freeing the name for re-upload.
    pub async fn delete_by_filename(&self, filename: &str) -> EngineResult<DeleteReceipt> {
        self.query.delete_by_filename(filename).await
    }

    /// Lookup by filename, routed by `opts`. See [`FileQueryOptions`].
    pub async fn get_files_by_name(&self, filename: &str, exact_match: bool, opts: FileQueryOptions) -> EngineResult<FilesResponse> {
        self.query.get_files_by_name(filename, exact_match, opts).await
    }

    /// Lookup by upload day, in either accepted date form.
    pub async fn get_files_by_upload_date(&self, upload_date: &str, opts: FileQueryOptions) -> EngineResult<FilesResponse> {
        self.query.get_files_by_upload_date(upload_date, opts).await
    }

    /// See [`QueryEngine::get_files_by_fields`].
    pub async fn get_files_by_fields(&self, fields: &FilterSet, opts: FileQueryOptions) -> EngineResult<FieldsResponse> {
        self.query.get_files_by_fields(fields, opts).await
    }
}
