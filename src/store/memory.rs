//! In-process [`StoreGateway`] backed by a single collection held in memory.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use tracing::debug;

use crate::types::{cmp_optional, Document, Value};

use super::{Filter, SortOrder, Stage, StoreError, StoreGateway, StoreResult};


/// A single named collection kept in memory.
///
/// Writes take an exclusive lock for the duration of one call, so each `insert_many` is atomic
/// with respect to concurrent readers.
#[derive(Debug)]
pub struct MemoryStore {
    collection: String,
    // Insertion order is natural order.
    docs: RwLock<Vec<Document>>,
}

impl MemoryStore {
    /// Create an empty store for `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Total number of stored documents.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.docs.read().map_err(|_| StoreError::Poisoned)?.len())
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|n| n == 0)
    }

    fn snapshot_matching(&self, filter: &Filter) -> StoreResult<Vec<Document>> {
        let compiled = filter.compile()?;
        let guard = self.docs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard
            .iter()
            .filter(|d| compiled.matches(d))
            .cloned()
            .collect())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("files")
    }
}

#[async_trait]
impl StoreGateway for MemoryStore {
    async fn insert_many(&self, docs: Vec<Document>) -> StoreResult<()> {
        let mut guard = self.docs.write().map_err(|_| StoreError::Poisoned)?;
        let n = docs.len();
        guard.extend(docs);
        debug!(collection = %self.collection, inserted = n, "insert_many");
        Ok(())
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        let compiled = filter.compile()?;
        let guard = self.docs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard
            .iter()
            .find(|d| compiled.matches(d))
            .cloned())
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let compiled = filter.compile()?;
        let guard = self.docs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.iter().filter(|d| compiled.matches(d)).count() as u64)
    }

    async fn aggregate(&self, pipeline: &[Stage], limit: Option<usize>) -> StoreResult<Vec<Document>> {
        // A leading match is applied while reading so only matching documents are cloned.
        let (mut docs, rest) = match pipeline.split_first() {
            Some((Stage::Match(filter), rest)) => (self.snapshot_matching(filter)?, rest),
            _ => (self.snapshot_matching(&Filter::All)?, pipeline),
        };

        for stage in rest {
            docs = apply_stage(docs, stage)?;
        }
        if let Some(n) = limit {
            docs.truncate(n);
        }
        Ok(docs)
    }

    async fn delete_many(&self, filter: &Filter) -> StoreResult<u64> {
        let compiled = filter.compile()?;
        let mut guard = self.docs.write().map_err(|_| StoreError::Poisoned)?;
        let before = guard.len();
        guard.retain(|d| !compiled.matches(d));
        let deleted = (before - guard.len()) as u64;
        debug!(collection = %self.collection, deleted, "delete_many");
        Ok(deleted)
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(!self.docs.is_poisoned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn apply_stage(mut docs: Vec<Document>, stage: &Stage) -> StoreResult<Vec<Document>> {
    match stage {
        Stage::Match(filter) => {
            let compiled = filter.compile()?;
            docs.retain(|d| compiled.matches(d));
        }
        Stage::Sort(keys) => {
            docs.sort_by(|a, b| {
                keys.iter()
                    .map(|(field, order)| {
                        let ord = cmp_optional(a.get(field), b.get(field));
                        match order {
                            SortOrder::Ascending => ord,
                            SortOrder::Descending => ord.reverse(),
                        }
                    })
                    .find(|o| o.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        Stage::Skip(n) => {
            docs.drain(..(*n).min(docs.len()));
        }
        Stage::Limit(n) => docs.truncate(*n),
        Stage::Exclude(fields) => {
            for d in &mut docs {
                for f in fields {
                    d.remove(f);
                }
            }
        }
        Stage::GroupFirst { by, key_as, first } => {
            docs = group_first(docs, by, key_as, first);
        }
        Stage::DateToString { field, format } => {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(StoreError::InvalidPredicate(format!(
                    "invalid date format '{format}'"
                )));
            }
            for d in &mut docs {
                if let Some(v) = d.get_mut(field) {
                    let rendered = match &*v {
                        Value::Date(date) => Value::Str(date.format(format).to_string()),
                        _ => Value::Empty,
                    };
                    *v = rendered;
                }
            }
        }
    }
    Ok(docs)
}

// Groups come out in order of first appearance.
fn group_first(docs: Vec<Document>, by: &str, key_as: &str, first: &[(String, String)]) -> Vec<Document> {
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();
    let mut out: Vec<Document> = Vec::new();

    for doc in docs {
        let key_value = doc.get(by).cloned();
        let key = GroupKey::from(key_value.as_ref());
        if slots.contains_key(&key) {
            continue;
        }
        slots.insert(key, out.len());

        let mut grouped = Document::new();
        grouped.insert(key_as.to_owned(), key_value.unwrap_or(Value::Empty));
        for (output, source) in first {
            if let Some(v) = doc.get(source) {
                grouped.insert(output.clone(), v.clone());
            }
        }
        out.push(grouped);
    }
    out
}

// The empty marker groups with `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Missing,
    Str(String),
    Date(chrono::NaiveDate),
}

impl From<Option<&Value>> for GroupKey {
    fn from(v: Option<&Value>) -> Self {
        match v {
            None => GroupKey::Missing,
            Some(Value::Empty) => GroupKey::Str(String::new()),
            Some(Value::Str(s)) => GroupKey::Str(s.clone()),
            Some(Value::Date(d)) => GroupKey::Date(*d),
        }
    }
}
