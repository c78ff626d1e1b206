use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};

use financehub_engine::pipeline::{IngestOptions, Ingestor};
use financehub_engine::store::{
    Filter, MemoryStore, Stage, StoreError, StoreGateway, StoreResult,
};
use financehub_engine::types::{Document, Value};
use financehub_engine::{EngineError, ErrorKind};

const F1: &str = "Report banner\nRptDt;TckrSymb\n2024-01-01;PETR4\n15/02/2024;VALE3\n";

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ingestor(store: Arc<dyn StoreGateway>, chunk_size: usize) -> Ingestor {
    Ingestor::new(
        store,
        IngestOptions {
            chunk_size,
            ..Default::default()
        },
    )
}

async fn stored(store: &MemoryStore, filename: &str) -> Vec<Document> {
    store
        .aggregate(&[Stage::Match(Filter::equals("Filename", filename))], None)
        .await
        .unwrap()
}

#[tokio::test]
async fn csv_upload_is_stamped_and_dates_normalized() {
    let store = Arc::new(MemoryStore::default());
    let ing = ingestor(store.clone(), 1000);

    // 02:00 UTC is still the previous day at UTC-03:00.
    let now = Utc.with_ymd_and_hms(2024, 3, 2, 2, 0, 0).unwrap();
    let receipt = ing
        .ingest_at("f1.csv", "text/csv", F1.as_bytes().to_vec(), now)
        .await
        .unwrap();
    assert_eq!(receipt.rows, 2);
    assert_eq!(receipt.chunks, 1);
    assert_eq!(receipt.upload_date, ymd(2024, 3, 1));

    let docs = stored(&store, "f1.csv").await;
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|d| d["Upload_date"] == Value::Date(ymd(2024, 3, 1))));
    assert_eq!(docs[0]["RptDt"], Value::Date(ymd(2024, 1, 1)));
    assert_eq!(docs[1]["RptDt"], Value::Date(ymd(2024, 2, 15)));
    // Business date columns absent from the upload are stored as empty.
    assert_eq!(docs[0]["XprtnDt"], Value::Empty);
    assert_eq!(docs[0]["TckrSymb"], Value::from("PETR4"));
}

#[tokio::test]
async fn reupload_of_same_name_is_rejected_without_writes() {
    let store = Arc::new(MemoryStore::default());
    let ing = ingestor(store.clone(), 1000);

    ing.ingest("f1.csv", "text/csv", F1.as_bytes().to_vec())
        .await
        .unwrap();
    let err = ing
        .ingest("f1.csv", "text/csv", F1.as_bytes().to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::DuplicateFile { ref filename } if filename == "f1.csv"));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(store.len().unwrap(), 2);
}

#[tokio::test]
async fn empty_and_unsupported_uploads_are_rejected() {
    let store = Arc::new(MemoryStore::default());
    let ing = ingestor(store.clone(), 1000);

    let err = ing.ingest("f.csv", "text/csv", Vec::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyUpload));

    let err = ing
        .ingest("f.json", "application/json", b"[]".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedFormat { .. }));

    let err = ing
        .ingest("bad.csv", "text/csv", b"RptDt;A\n2024-01-01;1;2\n".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Parse { .. }));

    assert!(store.is_empty().unwrap());
}

#[tokio::test]
async fn records_are_written_in_chunks() {
    let store = Arc::new(MemoryStore::default());
    let ing = ingestor(store.clone(), 1);

    let receipt = ing
        .ingest("f1.csv", "text/csv", F1.as_bytes().to_vec())
        .await
        .unwrap();
    assert_eq!(receipt.chunks, 2);
    assert_eq!(store.len().unwrap(), 2);
}

/// Delegates to a [`MemoryStore`] but fails the `fail_on`-th insert (1-based) once, after
/// persisting the first `persist_before_failing` documents of that batch.
struct FlakyStore {
    inner: MemoryStore,
    inserts: AtomicUsize,
    fail_on: usize,
    persist_before_failing: usize,
}

impl FlakyStore {
    fn failing_on(fail_on: usize) -> Self {
        Self {
            inner: MemoryStore::default(),
            inserts: AtomicUsize::new(0),
            fail_on,
            persist_before_failing: 0,
        }
    }
}

#[async_trait]
impl StoreGateway for FlakyStore {
    async fn insert_many(&self, docs: Vec<Document>) -> StoreResult<()> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            let partial: Vec<Document> = docs.into_iter().take(self.persist_before_failing).collect();
            if !partial.is_empty() {
                self.inner.insert_many(partial).await?;
            }
            return Err(StoreError::Backend("write timed out".into()));
        }
        self.inner.insert_many(docs).await
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        self.inner.find_one(filter).await
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        self.inner.count(filter).await
    }

    async fn aggregate(&self, pipeline: &[Stage], limit: Option<usize>) -> StoreResult<Vec<Document>> {
        self.inner.aggregate(pipeline, limit).await
    }

    async fn delete_many(&self, filter: &Filter) -> StoreResult<u64> {
        self.inner.delete_many(filter).await
    }

    async fn health_check(&self) -> StoreResult<bool> {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

#[tokio::test]
async fn failed_chunk_rolls_back_and_name_can_be_retried() {
    let store = Arc::new(FlakyStore::failing_on(2));
    let ing = ingestor(store.clone(), 1);

    let err = ing
        .ingest("f1.csv", "text/csv", F1.as_bytes().to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(store.inner.is_empty().unwrap());

    let receipt = ing
        .ingest("f1.csv", "text/csv", F1.as_bytes().to_vec())
        .await
        .unwrap();
    assert_eq!(receipt.rows, 2);
    assert_eq!(store.inner.len().unwrap(), 2);
}

#[tokio::test]
async fn failed_first_chunk_with_partial_batch_is_rolled_back() {
    let store = Arc::new(FlakyStore {
        persist_before_failing: 1,
        ..FlakyStore::failing_on(1)
    });
    let ing = ingestor(store.clone(), 1000);

    let err = ing
        .ingest("f1.csv", "text/csv", F1.as_bytes().to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert!(store.inner.is_empty().unwrap());

    let receipt = ing
        .ingest("f1.csv", "text/csv", F1.as_bytes().to_vec())
        .await
        .unwrap();
    assert_eq!(receipt.chunks, 1);
    assert_eq!(store.inner.len().unwrap(), 2);
}

#[tokio::test]
async fn partial_write_is_kept_when_rollback_disabled() {
    let store = Arc::new(FlakyStore::failing_on(2));
    let ing = Ingestor::new(
        store.clone(),
        IngestOptions {
            chunk_size: 1,
            rollback_partial_writes: false,
            ..Default::default()
        },
    );

    ing.ingest("f1.csv", "text/csv", F1.as_bytes().to_vec())
        .await
        .unwrap_err();
    assert_eq!(store.inner.len().unwrap(), 1);

    let err = ing
        .ingest("f1.csv", "text/csv", F1.as_bytes().to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateFile { .. }));
}

#[tokio::test]
async fn upload_query_delete_scenario() {
    use financehub_engine::query::{FilterSet, QueryEngine};

    let store = Arc::new(MemoryStore::default());
    let ing = ingestor(store.clone(), 1000);
    let q = QueryEngine::new(store.clone());

    let csv = "Open interest\nRptDt;Filename\n2024-01-01;a.csv\n15/02/2024;b.csv\n";
    ing.ingest("f1.csv", "text/csv", csv.as_bytes().to_vec())
        .await
        .unwrap();

    let docs = stored(&store, "f1.csv").await;
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["Upload_date"], docs[1]["Upload_date"]);

    let page = q.list(1, 10).await.unwrap();
    let mut dates: Vec<&str> = page
        .data
        .iter()
        .map(|d| d["RptDt"].as_str().unwrap())
        .collect();
    dates.sort_unstable();
    assert_eq!(dates, vec!["2024-01-01", "2024-02-15"]);

    let err = ing
        .ingest("f1.csv", "text/csv", csv.as_bytes().to_vec())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(store.len().unwrap(), 2);

    let err = q
        .filter_by_fields(&FilterSet::new(), 1, 10, true)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "no field supplied");

    q.delete_by_filename("f1.csv").await.unwrap();
    let by_name = Filter::equals("Filename", "f1.csv");
    assert!(store.find_one(&by_name).await.unwrap().is_none());
}
