//! # beacon-core
//!
//! The projection layer between a server-push stream and a page's display
//! fields.
//!
//! Each raw message is decoded into an [`Envelope`], its `type` tag is
//! resolved against the fixed [`BindingTable`], and every `(selector, key)`
//! pair of the matching field map is written through a [`TargetResolver`].
//! Every failure is scoped to the one message that caused it and reported
//! through a [`DiagnosticSink`]; nothing propagates to the caller.
//!
//! ```no_run
//! use beacon_core::{Dispatcher, FieldBoard, TracingSink};
//!
//! let dispatcher = Dispatcher::new(TracingSink);
//! let mut board = FieldBoard::from_table(dispatcher.table());
//! dispatcher.dispatch(r#"{"type":"status","data":{"status":"ONLINE"}}"#, &mut board);
//! assert_eq!(board.text("[data-status]"), Some("ONLINE"));
//! ```

#![deny(unsafe_code)]

pub mod binding;
pub mod board;
pub mod diagnostics;
pub mod dispatch;
pub mod display;
pub mod envelope;
pub mod target;

pub use binding::{Binding, BindingTable, EventKind, FieldMap};
pub use board::FieldBoard;
pub use diagnostics::{DiagnosticSink, DispatchError, MemorySink, TracingSink};
pub use dispatch::{BindReport, Dispatcher};
pub use display::{display_value, PLACEHOLDER};
pub use envelope::Envelope;
pub use target::TargetResolver;
