//! # beacon-stream
//!
//! Native server-sent events connector: the long-lived connection that feeds
//! raw messages to the dispatcher.
//!
//! - [`frame`]: byte stream to SSE frames
//! - [`connector`]: reconnecting client with `EventSource` semantics
//! - [`config`]: endpoint, timeouts and backoff
//! - [`error`]: transport failures

#![deny(unsafe_code)]

pub mod config;
pub mod connector;
pub mod error;
pub mod frame;

pub use config::{ReconnectConfig, StreamConfig, DEFAULT_ENDPOINT};
pub use connector::{CloseReason, ReadyState, StreamConnector, StreamHandler};
pub use error::TransportError;
pub use frame::{sse_frames, Frame, SseDecoder, SseEvent};
