#![cfg(feature = "excel")]

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};

use crate::error::{EngineError, EngineResult};
use crate::types::RawTable;

use super::decode::header_offset;

const FORMAT: &str = "spreadsheet";

/// Parse an in-memory workbook (`.xlsx`, `.xls`, `.ods`, ...) into a [`RawTable`].
///
/// Behavior:
/// - Reads the first sheet in the workbook
/// - Row 0 is the header if any of its cells mentions `RptDt`; otherwise row 1 is
/// - Fully empty rows below the header are skipped
/// - Cells are rendered as strings; date cells as `YYYY-MM-DD`
pub fn parse_spreadsheet_bytes(bytes: &[u8]) -> EngineResult<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| EngineError::parse(FORMAT, e.to_string()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| EngineError::parse(FORMAT, "workbook has no sheets"))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| EngineError::parse(FORMAT, format!("sheet '{sheet}': {e}")))?;

    ingest_sheet_range(&sheet, &range)
}

fn ingest_sheet_range(sheet: &str, range: &calamine::Range<Data>) -> EngineResult<RawTable> {
    let mut rows = range.rows();

    let first = rows
        .next()
        .ok_or_else(|| EngineError::parse(FORMAT, format!("sheet '{sheet}' is empty")))?;
    let first_cells: Vec<String> = first.iter().map(cell_to_string).collect();

    let header_cells = if header_offset(&first_cells.join(";")) == 0 {
        first_cells
    } else {
        let second = rows.next().ok_or_else(|| {
            EngineError::parse(FORMAT, format!("sheet '{sheet}' has no header row"))
        })?;
        second.iter().map(cell_to_string).collect()
    };
    if header_cells.iter().all(|h| h.trim().is_empty()) {
        return Err(EngineError::parse(
            FORMAT,
            format!("sheet '{sheet}': no columns to parse"),
        ));
    }

    let width = header_cells.len();
    let mut out: Vec<Vec<String>> = Vec::new();
    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut cells: Vec<String> = row.iter().map(cell_to_string).collect();
        cells.resize(width, String::new());
        out.push(cells);
    }

    Ok(RawTable::new(header_cells, out))
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => match c.as_date() {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => c.to_string(),
        },
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}
