//! Ingestion pipeline: duplicate gate → parse → stamp → normalize dates → chunked write.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{IngestSettings, DEFAULT_CHUNK_SIZE, DEFAULT_UTC_OFFSET_MINUTES};
use crate::dates::normalize_document;
use crate::error::{EngineError, EngineResult};
use crate::ingestion::{
    parse_upload, severity_for_error, IngestionContext, IngestionObserver, IngestionSeverity,
    IngestionStats,
};
use crate::store::{Filter, StoreGateway};
use crate::types::{Document, Value, FILENAME_FIELD, UPLOAD_DATE_FIELD};

/// Confirmation returned for an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    /// Upload name the records are stored under.
    pub filename: String,
    /// Number of stored records.
    pub rows: usize,
    /// Number of insert calls issued.
    pub chunks: usize,
    /// Day stamped on every record of this upload.
    pub upload_date: NaiveDate,
}

/// Options controlling the ingestion pipeline.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestOptions {
    /// Rows per `insert_many` call. Must be `>= 1`.
    pub chunk_size: usize,
    /// Local zone used to compute `Upload_date`.
    pub local_offset: FixedOffset,
    /// Delete whatever was stored under the filename when any chunk write fails. A failing
    /// backend may have persisted part of the very chunk it rejected.
    pub rollback_partial_writes: bool,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestOptions")
            .field("chunk_size", &self.chunk_size)
            .field("local_offset", &self.local_offset)
            .field("rollback_partial_writes", &self.rollback_partial_writes)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            local_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60)
                .unwrap_or_else(|| Utc.fix()),
            rollback_partial_writes: true,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl IngestOptions {
    /// Build options from loaded settings.
    pub fn from_settings(settings: &IngestSettings) -> Result<Self, config::ConfigError> {
        Ok(Self {
            chunk_size: settings.chunk_size.max(1),
            local_offset: settings.local_offset()?,
            rollback_partial_writes: settings.rollback_partial_writes,
            ..Default::default()
        })
    }
}

/// Ingests uploads into the injected store.
pub struct Ingestor {
    store: Arc<dyn StoreGateway>,
    opts: IngestOptions,
}

impl Ingestor {
    /// Create an ingestor writing into `store`.
    pub fn new(store: Arc<dyn StoreGateway>, opts: IngestOptions) -> Self {
        Self { store, opts }
    }

    /// Attach an observer for ingestion outcomes.
    pub fn with_observer(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.opts.observer = Some(observer);
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &IngestOptions {
        &self.opts
    }

    /// Ingest one upload, stamping it with today's date in the configured zone.
    ///
    /// # Errors
    ///
    /// - [`EngineError::EmptyUpload`] if `bytes` is empty
    /// - [`EngineError::DuplicateFile`] if records already exist under `filename`
    /// - [`EngineError::UnsupportedFormat`] / [`EngineError::Parse`] for bad content
    /// - [`EngineError::Store`] if the store fails; already written chunks are rolled back when
    ///   [`IngestOptions::rollback_partial_writes`] is set
    pub async fn ingest(&self, filename: &str, content_type: &str, bytes: Vec<u8>) -> EngineResult<UploadReceipt> {
        self.ingest_at(filename, content_type, bytes, Utc::now()).await
    }

    /// Same as [`Ingestor::ingest`] with an explicit ingestion instant.
    pub async fn ingest_at(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
        now: DateTime<Utc>,
    ) -> EngineResult<UploadReceipt> {
        let mut ctx = IngestionContext {
            filename: filename.to_owned(),
            content_type: content_type.to_owned(),
            format: None,
        };

        let result = self.run(&mut ctx, bytes, now).await;

        if let Some(obs) = self.opts.observer.as_ref() {
            match &result {
                Ok(receipt) => obs.on_success(
                    &ctx,
                    IngestionStats {
                        rows: receipt.rows,
                        chunks: receipt.chunks,
                    },
                ),
                Err(e) => {
                    let sev = severity_for_error(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= self.opts.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }

        result
    }

    async fn run(&self, ctx: &mut IngestionContext, bytes: Vec<u8>, now: DateTime<Utc>) -> EngineResult<UploadReceipt> {
        if bytes.is_empty() || ctx.filename.is_empty() {
            return Err(EngineError::EmptyUpload);
        }

        let by_name = Filter::equals(FILENAME_FIELD, ctx.filename.as_str());
        if self.store.find_one(&by_name).await?.is_some() {
            return Err(EngineError::DuplicateFile {
                filename: ctx.filename.clone(),
            });
        }

        let upload_date = now.with_timezone(&self.opts.local_offset).date_naive();
        let filename = ctx.filename.clone();
        let content_type = ctx.content_type.clone();

        // Parsing and date normalization are CPU-bound; keep them off the async workers.
        let (format, docs) = tokio::task::spawn_blocking(move || {
            let (format, table) = parse_upload(&content_type, &bytes)?;
            let docs = prepare_documents(table.into_documents(), &filename, upload_date);
            Ok::<_, EngineError>((format, docs))
        })
        .await
        .map_err(|e| EngineError::Task(e.to_string()))??;
        ctx.format = Some(format);

        let rows = docs.len();
        info!(
            filename = %ctx.filename,
            format = format.label(),
            rows,
            %upload_date,
            "Parsed upload"
        );

        let chunks = self.write_chunks(&ctx.filename, docs, &by_name).await?;

        Ok(UploadReceipt {
            filename: ctx.filename.clone(),
            rows,
            chunks,
            upload_date,
        })
    }

    async fn write_chunks(&self, filename: &str, docs: Vec<Document>, by_name: &Filter) -> EngineResult<usize> {
        let chunk_size = self.opts.chunk_size.max(1);
        let total = docs.len().div_ceil(chunk_size);
        let mut written = 0usize;

        let mut docs = docs.into_iter().peekable();
        while docs.peek().is_some() {
            let chunk: Vec<Document> = docs.by_ref().take(chunk_size).collect();
            let n = chunk.len();
            if let Err(e) = self.store.insert_many(chunk).await {
                error!(
                    filename = %filename,
                    chunk = written + 1,
                    of = total,
                    error = %e,
                    "Chunk write failed"
                );
                if self.opts.rollback_partial_writes {
                    self.rollback(filename, by_name).await;
                }
                return Err(e.into());
            }
            written += 1;
            debug!(filename = %filename, chunk = written, of = total, rows = n, "Chunk written");
        }
        Ok(written)
    }

    // Best effort: a failed rollback leaves the partial set in place and is only logged.
    async fn rollback(&self, filename: &str, by_name: &Filter) {
        match self.store.delete_many(by_name).await {
            Ok(0) => debug!(filename = %filename, "Nothing to roll back"),
            Ok(deleted) => warn!(filename = %filename, deleted, "Rolled back partial upload"),
            Err(e) => error!(
                filename = %filename,
                error = %e,
                "Rollback of partial upload failed; re-upload will be rejected as duplicate"
            ),
        }
    }
}

/// Stamp every row with its upload metadata and normalize the date-bearing columns.
pub fn prepare_documents(mut docs: Vec<Document>, filename: &str, upload_date: NaiveDate) -> Vec<Document> {
    docs.par_iter_mut().for_each(|doc| {
        doc.insert(FILENAME_FIELD.to_owned(), Value::from(filename));
        doc.insert(UPLOAD_DATE_FIELD.to_owned(), Value::Date(upload_date));
        normalize_document(doc);
    });
    docs
}
