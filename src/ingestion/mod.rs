//! Tabular parsing of uploads.
//!
//! Most callers should use [`parse_upload`] (from [`unified`]) which:
//!
//! - selects a parser from the declared content type
//! - decodes bytes (UTF-8, falling back to Latin-1) and finds the header row
//! - returns a [`crate::types::RawTable`] of string cells
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - `excel` (feature `excel`)
//!
//! [`observability`] holds the observer hooks the ingestion pipeline reports outcomes through.

pub mod csv;
pub mod decode;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;
pub mod unified;

pub use observability::{
    severity_for_error, CompositeObserver, IngestionContext, IngestionObserver, IngestionSeverity,
    IngestionStats, TracingObserver,
};
pub use unified::{parse_upload, UploadFormat, CSV_CONTENT_TYPE, XLSX_CONTENT_TYPE};
