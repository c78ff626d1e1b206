//! Date normalization for the fixed set of date-bearing columns.
//!
//! Uploads carry dates either as ISO `YYYY-MM-DD` or as `DD/MM/YYYY`. On write every date-bearing
//! column is normalized to [`Value::Date`] or the [`Value::Empty`] marker; on read the same columns
//! are rendered back to `YYYY-MM-DD` strings (or `""`).

use chrono::NaiveDate;

use crate::types::{Document, Value, UPLOAD_DATE_FIELD};

/// Date-bearing business columns found in uploads.
pub const BUSINESS_DATE_COLUMNS: [&str; 8] = [
    "RptDt",
    "XprtnDt",
    "TradgStartDt",
    "TradgEndDt",
    "DlvryNtceStartDt",
    "DlvryNtceEndDt",
    "OpngPosLmtDt",
    "CorpActnStartDt",
];

/// Every date-bearing column, including the injected upload date.
pub const DATE_COLUMNS: [&str; 9] = [
    UPLOAD_DATE_FIELD,
    "RptDt",
    "XprtnDt",
    "TradgStartDt",
    "TradgEndDt",
    "DlvryNtceStartDt",
    "DlvryNtceEndDt",
    "OpngPosLmtDt",
    "CorpActnStartDt",
];

const ISO_FORMAT: &str = "%Y-%m-%d";
const DAY_FIRST_FORMAT: &str = "%d/%m/%Y";

/// Whether `column` is one of the date-bearing columns.
pub fn is_date_column(column: &str) -> bool {
    DATE_COLUMNS.contains(&column)
}

/// Parse `raw` as `YYYY-MM-DD`, then as `DD/MM/YYYY`.
///
/// Returns `None` for empty or unparsable input; never fails.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, ISO_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, DAY_FIRST_FORMAT))
        .ok()
}

/// Normalize a raw string to a canonical date or the empty marker.
pub fn normalize(raw: &str) -> Value {
    parse_date(raw).map(Value::Date).unwrap_or(Value::Empty)
}

/// Normalize an already stored value.
///
/// Dates stay dates, strings go through [`normalize`], anything else becomes the empty marker.
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Date(d) => Value::Date(*d),
        Value::Str(s) => normalize(s),
        Value::Empty => Value::Empty,
    }
}

/// Turn a raw filter value into the value a store predicate compares against.
///
/// Date columns are normalized; a value that does not parse is passed through unchanged so it
/// still takes part in an equality match. Other columns are never touched.
pub fn format_for_query(column: &str, raw: &str) -> Value {
    if !is_date_column(column) {
        return Value::from(raw);
    }
    match parse_date(raw) {
        Some(d) => Value::Date(d),
        None => Value::from(raw),
    }
}

/// Render a stored value for output.
///
/// Date columns holding a canonical date become `YYYY-MM-DD`; date columns holding anything else
/// (or nothing) become `""`. Non-date columns are returned as stored.
pub fn render_for_output(column: &str, stored: Option<&Value>) -> Value {
    if !is_date_column(column) {
        return stored.cloned().unwrap_or(Value::Empty);
    }
    match stored {
        Some(Value::Date(d)) => Value::Str(d.format(ISO_FORMAT).to_string()),
        _ => Value::Str(String::new()),
    }
}

/// Normalize every business date column of a freshly parsed row in place.
///
/// Missing columns are added with the empty marker so each stored record carries all of them.
pub fn normalize_document(doc: &mut Document) {
    for column in BUSINESS_DATE_COLUMNS {
        let normalized = doc.get(column).map(normalize_value).unwrap_or(Value::Empty);
        doc.insert(column.to_owned(), normalized);
    }
}

/// Render every date-bearing column of a document for output.
pub fn render_document(mut doc: Document) -> Document {
    for column in DATE_COLUMNS {
        let rendered = render_for_output(column, doc.get(column));
        doc.insert(column.to_owned(), rendered);
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepts_iso_and_day_first() {
        assert_eq!(normalize("2024-01-01"), Value::Date(ymd(2024, 1, 1)));
        assert_eq!(normalize("15/02/2024"), Value::Date(ymd(2024, 2, 15)));
    }

    #[test]
    fn invalid_or_empty_input_becomes_empty_marker() {
        assert_eq!(normalize(""), Value::Empty);
        assert_eq!(normalize("   "), Value::Empty);
        assert_eq!(normalize("2024-13-01"), Value::Empty);
        assert_eq!(normalize("02/15/2024"), Value::Empty);
        assert_eq!(normalize("not a date"), Value::Empty);
    }

    #[test]
    fn render_round_trips_calendar_date() {
        for raw in ["2023-12-31", "31/12/2023"] {
            let stored = normalize(raw);
            assert_eq!(
                render_for_output("RptDt", Some(&stored)),
                Value::from("2023-12-31")
            );
        }
        assert_eq!(render_for_output("RptDt", Some(&normalize("nope"))), Value::from(""));
        assert_eq!(render_for_output("XprtnDt", None), Value::from(""));
    }

    #[test]
    fn format_for_query_keeps_unparsable_raw_value() {
        assert_eq!(format_for_query("RptDt", "01/03/2024"), Value::Date(ymd(2024, 3, 1)));
        assert_eq!(format_for_query("RptDt", "March"), Value::from("March"));
        assert_eq!(format_for_query("Ticker", "2024-01-01"), Value::from("2024-01-01"));
    }

    #[test]
    fn normalize_document_fills_missing_columns() {
        let mut doc = Document::new();
        doc.insert("RptDt".into(), Value::from("01/01/2024"));
        doc.insert("XprtnDt".into(), Value::from("garbage"));
        doc.insert("Ticker".into(), Value::from("VALE3"));
        normalize_document(&mut doc);

        assert_eq!(doc["RptDt"], Value::Date(ymd(2024, 1, 1)));
        assert_eq!(doc["XprtnDt"], Value::Empty);
        assert_eq!(doc["CorpActnStartDt"], Value::Empty);
        assert_eq!(doc["Ticker"], Value::from("VALE3"));
    }

    #[test]
    fn render_document_covers_every_date_column() {
        let mut doc = Document::new();
        doc.insert("RptDt".into(), Value::Date(ymd(2024, 2, 15)));
        let out = render_document(doc);
        assert_eq!(out["RptDt"], Value::from("2024-02-15"));
        assert_eq!(out[UPLOAD_DATE_FIELD], Value::from(""));
        assert_eq!(out.len(), DATE_COLUMNS.len());
    }
}
