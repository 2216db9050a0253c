//! Per-message failures and where they are reported.
//!
//! A [`DispatchError`] never escapes the dispatcher. It is handed to a
//! [`DiagnosticSink`], which decides how a developer gets to see it.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, warn};

use crate::binding::EventKind;

/// Why a single message produced no update.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The raw text is not JSON.
    #[error("bad event payload: {message}")]
    Decode {
        /// Parser message.
        message: String,
        /// The rejected text.
        raw: String,
    },
    /// The JSON is not an object with a string `type`.
    #[error("event missing type (found {found})")]
    Schema {
        /// JSON type of the value, or of `type` when that is the problem.
        found: &'static str,
        /// The rejected text.
        raw: String,
    },
    /// No field map is registered for this `type`.
    #[error("unhandled event type {kind:?}")]
    UnknownType {
        /// The unregistered tag.
        kind: String,
        /// The rejected text.
        raw: String,
    },
    /// A registered type arrived without `data`.
    #[error("event {kind} missing data")]
    MissingPayload {
        /// The registered kind that lacked data.
        kind: EventKind,
        /// The rejected text.
        raw: String,
    },
}

impl DispatchError {
    /// Short classification string for logging and summaries.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::Schema { .. } => "schema",
            Self::UnknownType { .. } => "unknown_type",
            Self::MissingPayload { .. } => "missing_payload",
        }
    }

    /// The raw message that caused the failure.
    pub fn raw(&self) -> &str {
        match self {
            Self::Decode { raw, .. }
            | Self::Schema { raw, .. }
            | Self::UnknownType { raw, .. }
            | Self::MissingPayload { raw, .. } => raw,
        }
    }
}

/// Destination for developer-facing diagnostics.
pub trait DiagnosticSink {
    /// Record one failed message.
    fn record(&self, error: &DispatchError);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn record(&self, error: &DispatchError) {
        (**self).record(error);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Arc<S> {
    fn record(&self, error: &DispatchError) {
        (**self).record(error);
    }
}

impl<A: DiagnosticSink, B: DiagnosticSink> DiagnosticSink for (A, B) {
    fn record(&self, error: &DispatchError) {
        self.0.record(error);
        self.1.record(error);
    }
}

/// Writes diagnostics through `tracing`. Decode failures log at `error`,
/// everything else at `warn`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: &DispatchError) {
        match diagnostic {
            DispatchError::Decode { message, raw } => {
                error!(error = %message, raw = %raw, "bad event payload");
            }
            DispatchError::Schema { found, raw } => {
                warn!(found, raw = %raw, "event missing type");
            }
            DispatchError::UnknownType { kind, raw } => {
                warn!(event_type = %kind, raw = %raw, "unhandled event type");
            }
            DispatchError::MissingPayload { kind, raw } => {
                warn!(event_type = %kind, raw = %raw, "event missing data");
            }
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DispatchError>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<DispatchError> {
        self.records.lock().clone()
    }

    /// Number of records so far.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Number of records with the given [`DispatchError::error_kind`].
    pub fn count_kind(&self, kind: &str) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|record| record.error_kind() == kind)
            .count()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, error: &DispatchError) {
        self.records.lock().push(error.clone());
    }
}
