//! Format dispatch by declared content type.
//!
//! Callers hand over raw bytes plus the content type the client declared for them;
//! [`parse_upload`] selects the parser and returns a [`RawTable`].

use crate::error::{EngineError, EngineResult};
use crate::types::RawTable;

use super::csv;

/// Declared type for delimiter-separated uploads.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Declared type for spreadsheet uploads.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    /// Semicolon-separated text.
    Csv,
    /// Spreadsheet workbook (feature-gated behind `excel`).
    Spreadsheet,
}

impl UploadFormat {
    /// Map a declared content type onto a format (case-insensitive, parameters ignored).
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            CSV_CONTENT_TYPE => Some(Self::Csv),
            XLSX_CONTENT_TYPE => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    /// Short label used in logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            UploadFormat::Csv => "CSV",
            UploadFormat::Spreadsheet => "spreadsheet",
        }
    }
}

/// Parse an upload according to its declared content type.
///
/// # Errors
///
/// - [`EngineError::UnsupportedFormat`] if the type is not recognized (or spreadsheet support is
///   compiled out)
/// - [`EngineError::Parse`] if the content is malformed
///
/// # Example
///
/// ```rust
/// use financehub_engine::ingestion::parse_upload;
///
/// # fn main() -> Result<(), financehub_engine::EngineError> {
/// let bytes = b"Open interest report\nRptDt;TckrSymb\n2024-01-01;PETR4\n";
/// let (_, table) = parse_upload("text/csv", bytes)?;
/// assert_eq!(table.headers, vec!["RptDt", "TckrSymb"]);
/// assert_eq!(table.row_count(), 1);
/// # Ok(())
/// # }
/// ```
pub fn parse_upload(content_type: &str, bytes: &[u8]) -> EngineResult<(UploadFormat, RawTable)> {
    let format = UploadFormat::from_content_type(content_type).ok_or_else(|| {
        EngineError::UnsupportedFormat {
            content_type: content_type.to_owned(),
        }
    })?;

    let table = match format {
        UploadFormat::Csv => csv::parse_csv_bytes(bytes)?,
        UploadFormat::Spreadsheet => parse_spreadsheet_dispatch(content_type, bytes)?,
    };
    Ok((format, table))
}

fn parse_spreadsheet_dispatch(content_type: &str, bytes: &[u8]) -> EngineResult<RawTable> {
    // Avoid unused warnings when the feature is off.
    let _ = (content_type, bytes);

    #[cfg(feature = "excel")]
    {
        super::excel::parse_spreadsheet_bytes(bytes)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(EngineError::UnsupportedFormat {
            content_type: format!("{content_type} (enable cargo feature 'excel')"),
        })
    }
}
