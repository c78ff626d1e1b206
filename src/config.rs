//! Type-safe configuration loader using the `config` crate.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`financehub.toml` unless another path is given)
//! 3. environment variables prefixed with `FINANCEHUB__`, nested keys separated by `__`
//!    (e.g. `FINANCEHUB__INGEST__CHUNK_SIZE=500`)

use chrono::FixedOffset;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Default rows per insert call.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// America/Sao_Paulo has been a fixed UTC-03:00 since 2019.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -180;

/// Top-level engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Name of the record collection.
    pub collection: String,

    /// Ingestion pipeline settings.
    pub ingest: IngestSettings,

    /// Query engine settings.
    pub query: QuerySettings,
}

/// Settings for the ingestion pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSettings {
    /// Rows per `insert_many` call.
    pub chunk_size: usize,

    /// Offset of the local time zone used to stamp `Upload_date`, in minutes east of UTC.
    pub utc_offset_minutes: i32,

    /// Delete already written chunks when a later chunk fails, so the name can be re-uploaded.
    pub rollback_partial_writes: bool,
}

/// Settings for the query engine.
#[derive(Debug, Clone, Deserialize)]
pub struct QuerySettings {
    /// Page size used by callers that do not pass one.
    pub default_page_size: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection: "files".to_string(),
            ingest: IngestSettings::default(),
            query: QuerySettings::default(),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            rollback_partial_writes: true,
        }
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
        }
    }
}

impl IngestSettings {
    /// The configured local zone as a fixed offset.
    pub fn local_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::Message(format!(
                "ingest.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

impl Settings {
    /// Load settings from `financehub.toml` (if present) and `FINANCEHUB__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("financehub")
    }

    /// Load settings from the given file path or stem (if present), then the environment.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let cfg = Config::builder()
            .set_default("collection", defaults.collection)?
            .set_default("ingest.chunk_size", defaults.ingest.chunk_size as i64)?
            .set_default("ingest.utc_offset_minutes", i64::from(defaults.ingest.utc_offset_minutes))?
            .set_default("ingest.rollback_partial_writes", defaults.ingest.rollback_partial_writes)?
            .set_default("query.default_page_size", defaults.query.default_page_size as i64)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("FINANCEHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.chunk_size == 0 {
            return Err(ConfigError::Message("ingest.chunk_size must be >= 1".into()));
        }
        if self.query.default_page_size == 0 {
            return Err(ConfigError::Message("query.default_page_size must be >= 1".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Message("collection must not be empty".into()));
        }
        self.ingest.local_offset()?;
        Ok(())
    }
}
