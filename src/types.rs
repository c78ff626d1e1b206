//! Core data model types for ingestion and querying.
//!
//! Parsers produce a [`RawTable`] (a header plus string rows). The pipeline turns each row into a
//! [`Document`], a field-name → [`Value`] mapping, which is the unit the store persists and the
//! query engine returns.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Field holding the original upload name. Partition key for all per-file queries.
pub const FILENAME_FIELD: &str = "Filename";

/// Field holding the day an upload was ingested.
pub const UPLOAD_DATE_FIELD: &str = "Upload_date";

/// Business date column; flat listings are ordered by it, newest first.
pub const REPORT_DATE_FIELD: &str = "RptDt";

/// A single stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit empty marker. Serializes as `""`.
    Empty,
    /// Canonical calendar date.
    Date(NaiveDate),
    /// Raw string value as read from the upload.
    Str(String),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Empty => serializer.serialize_str(""),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl Value {
    /// Borrow the value as a string slice, if it is a string (the empty marker counts as `""`).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            Value::Empty => Some(""),
            _ => None,
        }
    }

    /// Returns the calendar date, if this value holds one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether this is the empty marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Equality as predicates see it: the empty marker equals `""`.
    pub fn matches(&self, other: &Value) -> bool {
        match (self.as_str(), other.as_str()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Total order used by sort stages. Strings (the empty marker as `""`) sort below dates.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Date(_), _) => Ordering::Greater,
            (_, Value::Date(_)) => Ordering::Less,
            (a, b) => a.as_str().unwrap_or("").cmp(b.as_str().unwrap_or("")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// One persisted row: field name → value.
pub type Document = BTreeMap<String, Value>;

/// Compare two optional field values the way sort stages do: a missing field sorts first.
pub fn cmp_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.sort_cmp(b),
    }
}

/// Parsed tabular content before any metadata or date handling.
///
/// `rows` are row-major and each row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    /// Column names, in file order, already de-duplicated.
    pub headers: Vec<String>,
    /// String cells.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table from a raw header row, normalizing blank and repeated names.
    pub fn new(raw_headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers: dedupe_headers(raw_headers),
            rows,
        }
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Convert every row into a [`Document`] keyed by header.
    pub fn into_documents(self) -> Vec<Document> {
        let headers = self.headers;
        self.rows
            .into_iter()
            .map(|row| {
                headers
                    .iter()
                    .cloned()
                    .zip(row.into_iter().map(Value::Str))
                    .collect()
            })
            .collect()
    }
}

/// Blank names become `Unnamed: <idx>`; repeats get `.1`, `.2`, ... suffixes.
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut out = Vec::with_capacity(raw.len());
    for (idx, name) in raw.into_iter().enumerate() {
        let trimmed = name.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            trimmed.to_owned()
        };

        let mut candidate = base.clone();
        while let Some(count) = seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{base}.{count}", count = *count);
        }
        seen.insert(candidate.clone(), 0);
        out.push(candidate);
    }
    out
}
