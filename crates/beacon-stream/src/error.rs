//! Transport-level failures.

use std::time::Duration;

/// Result type alias for connector setup.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Why the connection dropped or could not be opened.
///
/// These are reported to [`StreamHandler::on_error`](crate::StreamHandler::on_error)
/// and never end the run on their own, except [`InvalidUrl`](Self::InvalidUrl),
/// which is caught at construction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request never got a response (DNS, refused, TLS, timeout).
    #[error("connect failed: {0}")]
    Connect(String),

    /// The server answered with a non-2xx status.
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response is not an event stream.
    #[error("unexpected content type {found:?}")]
    ContentType {
        /// The `Content-Type` the server sent, empty if none.
        found: String,
    },

    /// The body failed mid-stream.
    #[error("stream read failed: {0}")]
    Read(String),

    /// No bytes arrived within the idle window.
    #[error("no data for {0:?}")]
    IdleTimeout(Duration),

    /// The server closed the body.
    #[error("stream ended")]
    Ended,

    /// The configured address cannot be turned into a URL.
    #[error("invalid url {url:?}: {message}")]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// Parser message.
        message: String,
    },
}

impl TransportError {
    /// Whether reconnecting can help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidUrl { .. })
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Status { .. } => "status",
            Self::ContentType { .. } => "content_type",
            Self::Read(_) => "read",
            Self::IdleTimeout(_) => "idle_timeout",
            Self::Ended => "ended",
            Self::InvalidUrl { .. } => "invalid_url",
        }
    }
}
