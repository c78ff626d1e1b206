//! `financehub-engine` ingests `;`-delimited CSV and spreadsheet uploads of market reports into a
//! document store and answers paginated queries over the stored records.
//!
//! The primary entrypoint is [`Engine`], which wires a [`store::StoreGateway`] to the ingestion
//! pipeline ([`pipeline::Ingestor`]) and the read side ([`query::QueryEngine`]).
//!
//! ## What an upload becomes
//!
//! - Every row is one record (a [`types::Document`]), keyed by the header row. The header row is
//!   the first line when it contains `RptDt`, otherwise the second (the first is a banner).
//! - Each record is stamped with `Filename` and `Upload_date` (the local day of the upload).
//! - Date-bearing columns (see [`dates::DATE_COLUMNS`]) are stored as dates when they parse as
//!   `YYYY-MM-DD` or `DD/MM/YYYY`, and as empty otherwise.
//! - A name can only be uploaded once until it is deleted.
//!
//! Query results render the date-bearing columns back to `YYYY-MM-DD` (or `""`) and never carry
//! the stamped `Filename`/`Upload_date` values.
//!
//! ## Quick example
//!
//! ```rust
//! use financehub_engine::query::FilterSet;
//! use financehub_engine::{Engine, Settings};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::in_memory(&Settings::default())?;
//! engine.startup().await?;
//!
//! let csv = "Banner line\nRptDt;TckrSymb\n2024-01-01;PETR4\n15/02/2024;VALE3\n";
//! let receipt = engine.ingest("f1.csv", "text/csv", csv.as_bytes().to_vec()).await?;
//! assert_eq!(receipt.rows, 2);
//!
//! let page = engine.list(1, 10).await?;
//! assert_eq!(page.total_pages, 1);
//!
//! let hits = engine
//!     .filter_by_fields(&FilterSet::new().with("TckrSymb", "VALE3"), 1, 10, true)
//!     .await?;
//! assert_eq!(hits.data.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: the [`Engine`] facade
//! - [`ingestion`]: content-type dispatch, CSV/spreadsheet parsing and observer hooks
//! - [`pipeline`]: duplicate gate, stamping, date normalization and chunked writes
//! - [`query`]: listing, distinct-file lookups, field filters, upload history and deletion
//! - [`store`]: the store trait, predicates, pipeline stages and an in-memory backend
//! - [`dates`]: date-column rules
//! - [`config`]: settings loaded from defaults, a TOML file and `FINANCEHUB__*` variables
//! - [`types`] / [`error`]

pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod types;

pub use crate::config::Settings;
pub use crate::engine::Engine;
pub use crate::error::{EngineError, EngineResult, ErrorKind};
