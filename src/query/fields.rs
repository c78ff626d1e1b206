//! Field-set filtering.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dates::{format_for_query, is_date_column, render_for_output};
use crate::error::{EngineError, EngineResult};
use crate::store::Filter;
use crate::types::{Document, Value};

use super::{FileQueryOptions, Pagination, QueryEngine};

/// Column name → raw filter value. Empty and missing values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    fields: BTreeMap<String, Option<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or clear, with `None`) the filter for `column`.
    pub fn insert(&mut self, column: impl Into<String>, value: Option<String>) {
        self.fields.insert(column.into(), value);
    }

    /// Builder form of [`FilterSet::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, Some(value.into()));
        self
    }

    /// Build from a JSON object: strings are used as-is, numbers and booleans are stringified,
    /// `null` (and nested values) are ignored.
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let fields = map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    serde_json::Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                };
                (k.clone(), value)
            })
            .collect();
        Self { fields }
    }

    /// Entries with a usable value.
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().filter_map(|(k, v)| match v.as_deref() {
            Some(s) if !s.trim().is_empty() => Some((k.as_str(), s)),
            _ => None,
        })
    }

    /// Store predicate equivalent to this set: every active field must match.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoFieldSupplied`] if no entry has a usable value.
    pub fn predicate(&self) -> EngineResult<Filter> {
        let mut clauses: Vec<Filter> = self
            .active()
            .map(|(column, raw)| Filter::Eq {
                field: column.to_owned(),
                value: format_for_query(column, raw),
            })
            .collect();

        match clauses.len() {
            0 => Err(EngineError::NoFieldSupplied),
            1 => Ok(clauses.remove(0)),
            _ => Ok(Filter::And(clauses)),
        }
    }

    /// The active entries as they are echoed back to callers, date columns as `YYYY-MM-DD`.
    pub fn rendered(&self) -> BTreeMap<String, Value> {
        self.active()
            .map(|(column, raw)| {
                let value = if is_date_column(column) {
                    render_for_output(column, Some(&format_for_query(column, raw)))
                } else {
                    Value::from(raw)
                };
                (column.to_owned(), value)
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }
}

/// Records matching a [`FilterSet`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldsResponse {
    /// The pagination fields are only set for paginated requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    /// Echo of the supplied fields; date columns as `YYYY-MM-DD`.
    pub search_fields: BTreeMap<String, Value>,
    /// Matching records, newest `RptDt` first.
    pub data: Vec<Document>,
}

impl QueryEngine {
    /// Records matching every supplied field, newest `RptDt` first.
    ///
    /// With `paginate` only the requested page is returned, along with `total_pages`.
    pub async fn filter_by_fields(&self, fields: &FilterSet, page: u64, page_size: u64, paginate: bool) -> EngineResult<FieldsResponse> {
        let filter = fields.predicate()?;
        let search_fields = fields.rendered();

        if paginate {
            let p = Pagination::new(page, page_size)?;
            let (data, total_pages) = self.fetch_records(filter, Some(p)).await?;
            Ok(FieldsResponse {
                current_page: Some(p.page()),
                total_pages,
                page_size: Some(p.page_size()),
                search_fields,
                data,
            })
        } else {
            let (data, _) = self.fetch_records(filter, None).await?;
            Ok(FieldsResponse {
                current_page: None,
                total_pages: None,
                page_size: None,
                search_fields,
                data,
            })
        }
    }

    /// [`QueryEngine::filter_by_fields`] driven by the shared routing flags.
    ///
    /// `include_content` has no effect here: field filters always return records.
    pub async fn get_files_by_fields(&self, fields: &FilterSet, opts: FileQueryOptions) -> EngineResult<FieldsResponse> {
        self.filter_by_fields(fields, opts.page, opts.page_size, opts.paginate)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn empty_set_is_rejected() {
        assert!(matches!(
            FilterSet::new().predicate(),
            Err(EngineError::NoFieldSupplied)
        ));

        let mut blanks = FilterSet::new();
        blanks.insert("TckrSymb", Some(String::new()));
        blanks.insert("RptDt", None);
        assert!(matches!(blanks.predicate(), Err(EngineError::NoFieldSupplied)));
    }

    #[test]
    fn date_columns_are_normalized_in_the_predicate() {
        let set = FilterSet::new().with("RptDt", "15/02/2024");
        assert_eq!(
            set.predicate().unwrap(),
            Filter::Eq {
                field: "RptDt".into(),
                value: Value::Date(NaiveDate::from_ymd_opt(2024, 2, 15).unwrap()),
            }
        );
        assert_eq!(set.rendered()["RptDt"], Value::from("2024-02-15"));
    }

    #[test]
    fn several_fields_become_a_conjunction() {
        let set: FilterSet = [("TckrSymb", "PETR4"), ("Asst", "PETR")].into_iter().collect();
        match set.predicate().unwrap() {
            Filter::And(clauses) => assert_eq!(clauses.len(), 2),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn from_json_drops_nulls_and_stringifies_numbers() {
        let json = serde_json::json!({"TckrSymb": "VALE3", "Qty": 10, "XprtnDt": null});
        let set = FilterSet::from_json(json.as_object().unwrap());
        let active: Vec<_> = set.active().collect();
        assert_eq!(active, vec![("Qty", "10"), ("TckrSymb", "VALE3")]);
    }
}
