use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{EngineError, ErrorKind};

use super::unified::UploadFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Upload rejected because of its content or name.
    Error,
    /// Store or worker failure.
    Critical,
}

/// Context about an ingestion attempt.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Upload name.
    pub filename: String,
    /// Declared content type, as received.
    pub content_type: String,
    /// Resolved format, once known.
    pub format: Option<UploadFormat>,
}

/// Stats reported on successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Number of stored records.
    pub rows: usize,
    /// Number of insert calls issued.
    pub chunks: usize,
}

/// Observer interface for ingestion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when ingestion succeeds.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when ingestion fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &EngineError) {}

    /// Called when an ingestion failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &EngineError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Severity for a failed ingestion: client errors are `Error`, backend failures `Critical`.
pub fn severity_for_error(e: &EngineError) -> IngestionSeverity {
    match e.kind() {
        ErrorKind::Backend => IngestionSeverity::Critical,
        ErrorKind::InvalidInput | ErrorKind::Conflict | ErrorKind::NotFound => IngestionSeverity::Error,
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &EngineError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &EngineError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits ingestion events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        info!(
            filename = %ctx.filename,
            format = ?ctx.format,
            rows = stats.rows,
            chunks = stats.chunks,
            "Upload stored"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &EngineError) {
        if severity >= IngestionSeverity::Critical {
            error!(
                filename = %ctx.filename,
                content_type = %ctx.content_type,
                ?severity,
                error = %error,
                "Upload failed"
            );
        } else {
            warn!(
                filename = %ctx.filename,
                content_type = %ctx.content_type,
                ?severity,
                error = %error,
                "Upload rejected"
            );
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &EngineError) {
        error!(
            alert = true,
            filename = %ctx.filename,
            content_type = %ctx.content_type,
            ?severity,
            error = %error,
            "Upload failed"
        );
    }
}
