//! Per-message dispatch: parse, validate, resolve, bind.

use serde_json::Value;
use tracing::debug;

use crate::binding::{BindingTable, EventKind, FieldMap};
use crate::diagnostics::{DiagnosticSink, DispatchError};
use crate::display::display_value;
use crate::envelope::Envelope;
use crate::target::TargetResolver;

/// What one successful dispatch did to the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindReport {
    /// Kind of the applied event.
    pub kind: EventKind,
    /// Bindings whose selector matched and were written.
    pub written: usize,
    /// Bindings whose selector matched nothing.
    pub skipped: usize,
}

/// Routes raw messages to field writes.
///
/// Stateless across messages: the outcome of a dispatch depends only on the
/// raw text, the binding table and the targets present at that moment.
#[derive(Debug)]
pub struct Dispatcher<S> {
    table: BindingTable,
    sink: S,
}

impl<S: DiagnosticSink> Dispatcher<S> {
    /// Dispatcher over the builtin binding table.
    pub fn new(sink: S) -> Self {
        Self::with_table(BindingTable::builtin(), sink)
    }

    /// Dispatcher over a custom binding table.
    pub fn with_table(table: BindingTable, sink: S) -> Self {
        Self { table, sink }
    }

    /// The binding table in use.
    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    /// Where diagnostics go.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Handle one raw message. On failure exactly one diagnostic is recorded
    /// and no target is touched.
    pub fn dispatch<R: TargetResolver>(&self, raw: &str, targets: &mut R) -> Option<BindReport> {
        match self.try_dispatch(raw, targets) {
            Ok(report) => {
                debug!(
                    event_type = %report.kind,
                    written = report.written,
                    skipped = report.skipped,
                    "event bound"
                );
                Some(report)
            }
            Err(e) => {
                self.sink.record(&e);
                None
            }
        }
    }

    /// Like [`dispatch`](Self::dispatch) but hands the failure back instead of
    /// recording it.
    pub fn try_dispatch<R: TargetResolver>(
        &self,
        raw: &str,
        targets: &mut R,
    ) -> Result<BindReport, DispatchError> {
        let envelope = Envelope::parse(raw)?;

        let (kind, fields) =
            self.table
                .resolve(&envelope.kind)
                .ok_or_else(|| DispatchError::UnknownType {
                    kind: envelope.kind.clone(),
                    raw: raw.to_string(),
                })?;

        let data = envelope
            .data
            .as_ref()
            .ok_or_else(|| DispatchError::MissingPayload {
                kind,
                raw: raw.to_string(),
            })?;

        Ok(bind(kind, fields, data, targets))
    }
}

/// Write every binding of `fields` from `data` into `targets`.
///
/// Bindings are independent: a selector with no match is skipped and the
/// rest still run.
pub fn bind<R: TargetResolver>(
    kind: EventKind,
    fields: FieldMap,
    data: &Value,
    targets: &mut R,
) -> BindReport {
    let mut report = BindReport {
        kind,
        written: 0,
        skipped: 0,
    };

    for binding in fields {
        let Some(target) = targets.resolve(binding.selector) else {
            report.skipped += 1;
            continue;
        };
        let text = display_value(data.get(binding.key));
        targets.write_text(&target, &text);
        report.written += 1;
    }

    report
}
