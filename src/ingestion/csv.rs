//! Delimiter-separated upload parsing.

use crate::error::{EngineError, EngineResult};
use crate::types::RawTable;

use super::decode::{decode_content, header_offset, skip_lines};

/// Field separator used by the exports.
pub const DELIMITER: u8 = b';';

const FORMAT: &str = "CSV";

/// Parse raw CSV bytes into a [`RawTable`].
///
/// Rules:
///
/// - bytes are decoded as UTF-8, falling back to Latin-1
/// - the header is line 0 if that line mentions `RptDt`, otherwise line 1
/// - rows longer than the header are an error; shorter rows are padded with empty cells
pub fn parse_csv_bytes(bytes: &[u8]) -> EngineResult<RawTable> {
    parse_csv_str(&decode_content(bytes))
}

/// Parse already decoded CSV text.
pub fn parse_csv_str(text: &str) -> EngineResult<RawTable> {
    let first_line = text
        .lines()
        .next()
        .ok_or_else(|| EngineError::parse(FORMAT, "file is empty"))?;
    let offset = header_offset(first_line);
    let body = skip_lines(text, offset);

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());
    parse_csv_from_reader(&mut rdr, offset)
}

/// Parse CSV data from an existing reader whose first record is the header.
///
/// `line_offset` is the number of lines consumed before the reader started, used to report
/// 1-based line numbers relative to the original file.
pub fn parse_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    line_offset: usize,
) -> EngineResult<RawTable> {
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| EngineError::parse(FORMAT, e.to_string()))?
        .iter()
        .map(str::to_owned)
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(EngineError::parse(FORMAT, "no columns to parse from file"));
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| EngineError::parse(FORMAT, e.to_string()))?;
        if record.len() > headers.len() {
            let line = record
                .position()
                .map(|p| p.line() as usize + line_offset)
                .unwrap_or_default();
            return Err(EngineError::parse(
                FORMAT,
                format!(
                    "expected {} fields in line {line}, saw {}",
                    headers.len(),
                    record.len()
                ),
            ));
        }

        let mut row: Vec<String> = record.iter().map(str::to_owned).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_on_first_line() {
        let t = parse_csv_str("RptDt;TckrSymb\n2024-01-01;PETR4\n").unwrap();
        assert_eq!(t.headers, vec!["RptDt", "TckrSymb"]);
        assert_eq!(t.rows, vec![vec!["2024-01-01", "PETR4"]]);
    }

    #[test]
    fn banner_line_is_skipped() {
        let t = parse_csv_str("Posicoes em aberto\nRptDt;TckrSymb\n15/02/2024;VALE3\n").unwrap();
        assert_eq!(t.headers, vec!["RptDt", "TckrSymb"]);
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn short_rows_are_padded() {
        let t = parse_csv_str("RptDt;A;B\n2024-01-01\n").unwrap();
        assert_eq!(t.rows[0], vec!["2024-01-01", "", ""]);
    }

    #[test]
    fn long_rows_are_rejected_with_line_number() {
        let err = parse_csv_str("banner\nRptDt;A\n2024-01-01;x;extra\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("failed to parse CSV"));
        assert!(msg.contains("expected 2 fields in line 3, saw 3"), "{msg}");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(parse_csv_bytes(b"").is_err());
        assert!(parse_csv_bytes(b"banner only\n").is_err());
    }
}
