//! # Stream Connector
//!
//! Holds one server-sent event connection open for as long as the host runs.
//!
//! The connector behaves like a browser `EventSource`: it reconnects on its
//! own after any failure, resends the last seen event id, honors the server's
//! `retry:` hint, and stops for good when the server answers `204 No Content`.
//! It never parses payloads. Every unnamed event's data is handed to
//! [`StreamHandler::on_message`] as raw text, one event at a time.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::error::{Result, TransportError};
use crate::frame::{sse_frames, Frame, DEFAULT_EVENT};

const EVENT_STREAM: &str = "text/event-stream";
const LAST_EVENT_ID: &str = "Last-Event-ID";

/// Connection state, mirroring `EventSource.readyState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    /// Waiting for a response, or between attempts.
    Connecting,
    /// Headers accepted; frames are flowing.
    Open,
    /// `run` has returned.
    Closed,
}

/// Why [`StreamConnector::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The shutdown token fired.
    Cancelled,
    /// The server answered `204 No Content`.
    ServerClosed,
    /// `max_retries` consecutive attempts failed.
    RetriesExhausted,
}

/// Observation points for one connection.
///
/// Callbacks run on the connector's task; the next frame is not read until
/// the callback returns.
pub trait StreamHandler {
    /// The connection is open and the response is an event stream.
    fn on_open(&mut self) {}

    /// One inbound message, untouched.
    fn on_message(&mut self, data: &str);

    /// A transport failure. A reconnect follows unless the run is ending.
    fn on_error(&mut self, error: &TransportError);
}

impl<H: StreamHandler + ?Sized> StreamHandler for &mut H {
    fn on_open(&mut self) {
        (**self).on_open();
    }

    fn on_message(&mut self, data: &str) {
        (**self).on_message(data);
    }

    fn on_error(&mut self, error: &TransportError) {
        (**self).on_error(error);
    }
}

/// A reconnecting event stream client.
pub struct StreamConnector {
    config: StreamConfig,
    url: Url,
    client: reqwest::Client,
    state: watch::Sender<ReadyState>,
    last_event_id: Option<String>,
    server_retry: Option<Duration>,
    attempt: u32,
}

impl StreamConnector {
    /// Build a connector for `config`. Nothing is sent until [`run`](Self::run).
    pub fn new(config: StreamConfig) -> Result<Self> {
        let url = resolve_url(&config.base_url, &config.endpoint)?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (state, _) = watch::channel(ReadyState::Connecting);

        Ok(Self {
            config,
            url,
            client,
            state,
            last_event_id: None,
            server_retry: None,
            attempt: 0,
        })
    }

    /// The resolved stream URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Current connection state.
    pub fn ready_state(&self) -> ReadyState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ReadyState> {
        self.state.subscribe()
    }

    /// Last event id received, sent back on reconnect.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Connect and keep reconnecting until `cancel` fires, the server closes
    /// the stream for good, or the retry limit is hit.
    pub async fn run<H: StreamHandler + ?Sized>(
        &mut self,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> CloseReason {
        info!(url = %self.url, "connecting to event stream");

        let reason = loop {
            self.set_state(ReadyState::Connecting);

            let outcome = tokio::select! {
                () = cancel.cancelled() => break CloseReason::Cancelled,
                outcome = self.session(handler) => outcome,
            };

            let error = match outcome {
                Ok(()) => break CloseReason::ServerClosed,
                Err(error) => error,
            };

            warn!(
                error = %error,
                kind = error.error_kind(),
                attempt = self.attempt,
                "event stream error"
            );
            handler.on_error(&error);

            if !error.is_retryable() {
                break CloseReason::RetriesExhausted;
            }
            if let Some(max) = self.config.reconnect.max_retries {
                if self.attempt >= max {
                    break CloseReason::RetriesExhausted;
                }
            }

            let delay = self.next_delay();
            self.attempt += 1;
            debug!(delay_ms = delay.as_millis(), attempt = self.attempt, "reconnecting");

            tokio::select! {
                () = cancel.cancelled() => break CloseReason::Cancelled,
                () = tokio::time::sleep(delay) => {}
            }
        };

        self.set_state(ReadyState::Closed);
        info!(url = %self.url, reason = ?reason, "event stream closed");
        reason
    }

    fn next_delay(&self) -> Duration {
        self.server_retry
            .unwrap_or_else(|| self.config.reconnect.retry_delay(self.attempt))
    }

    /// One connection. `Ok` only for a permanent close; every other end is an
    /// error so the caller reconnects.
    async fn session<H: StreamHandler + ?Sized>(
        &mut self,
        handler: &mut H,
    ) -> std::result::Result<(), TransportError> {
        let mut request = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = &self.last_event_id {
            request = request.header(LAST_EVENT_ID, id.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            info!("server closed event stream with 204");
            return Ok(());
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !is_event_stream(content_type) {
            return Err(TransportError::ContentType {
                found: content_type.to_owned(),
            });
        }

        self.attempt = 0;
        self.set_state(ReadyState::Open);
        debug!(url = %self.url, "event stream open");
        handler.on_open();

        let chunks = body_chunks(response, self.config.idle_timeout);
        let mut frames = std::pin::pin!(sse_frames(chunks));
        loop {
            match frames.next().await {
                Some(Ok(Frame::Event(event))) => {
                    if let Some(id) = event.id {
                        self.remember_id(id);
                    }
                    if event.event == DEFAULT_EVENT {
                        handler.on_message(&event.data);
                    } else {
                        debug!(event = %event.event, "skipping named event");
                    }
                }
                Some(Ok(Frame::Id(id))) => self.remember_id(id),
                Some(Ok(Frame::Retry(delay))) => {
                    debug!(retry_ms = delay.as_millis(), "server set reconnection delay");
                    self.server_retry = Some(delay);
                }
                Some(Err(e)) => return Err(e),
                None => return Err(TransportError::Ended),
            }
        }
    }

    /// An empty id clears the stored one, so no header is sent on reconnect.
    fn remember_id(&mut self, id: String) {
        self.last_event_id = if id.is_empty() { None } else { Some(id) };
    }

    fn set_state(&self, state: ReadyState) {
        let _ = self.state.send_replace(state);
    }
}

/// Response body as chunks. With an idle window, a gap between any two
/// chunks longer than the window ends the body with
/// [`TransportError::IdleTimeout`]; keepalive comments count as traffic.
fn body_chunks(
    response: reqwest::Response,
    idle_timeout: Option<Duration>,
) -> BoxStream<'static, std::result::Result<Bytes, TransportError>> {
    let chunks = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(|e| TransportError::Read(e.to_string())));
    match idle_timeout {
        Some(idle) => Box::pin(
            chunks
                .timeout(idle)
                .map(move |item| item.unwrap_or_else(|_| Err(TransportError::IdleTimeout(idle)))),
        ),
        None => Box::pin(chunks),
    }
}

fn resolve_url(base_url: &str, endpoint: &str) -> Result<Url> {
    let invalid = |message: String| TransportError::InvalidUrl {
        url: format!("{base_url}{endpoint}"),
        message,
    };
    let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    base.join(endpoint).map_err(|e| invalid(e.to_string()))
}

fn is_event_stream(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(EVENT_STREAM))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_joined_to_base() {
        let url = resolve_url("http://localhost:8080", "/events").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/events");

        let url = resolve_url("http://localhost:8080/app/", "/events").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/events");
    }

    #[test]
    fn bad_base_is_invalid_url() {
        let err = resolve_url("not a url", "/events").unwrap_err();
        assert_eq!(err.error_kind(), "invalid_url");
        assert!(StreamConnector::new(StreamConfig::new("not a url")).is_err());
    }

    #[test]
    fn content_type_check_ignores_parameters_and_case() {
        assert!(is_event_stream("text/event-stream"));
        assert!(is_event_stream("text/event-stream; charset=utf-8"));
        assert!(is_event_stream("Text/Event-Stream"));
        assert!(!is_event_stream("text/plain"));
        assert!(!is_event_stream(""));
    }

    #[test]
    fn new_connector_starts_connecting() {
        let connector = StreamConnector::new(StreamConfig::new("http://localhost:1")).unwrap();
        assert_eq!(connector.ready_state(), ReadyState::Connecting);
        assert!(connector.last_event_id().is_none());
        assert_eq!(connector.url().path(), "/events");
    }

    #[test]
    fn empty_event_id_clears_the_stored_one() {
        let mut connector = StreamConnector::new(StreamConfig::new("http://localhost:1")).unwrap();
        connector.remember_id("12".into());
        assert_eq!(connector.last_event_id(), Some("12"));
        connector.remember_id(String::new());
        assert!(connector.last_event_id().is_none());
    }

    #[test]
    fn server_retry_hint_overrides_backoff() {
        let mut connector = StreamConnector::new(StreamConfig::new("http://localhost:1")).unwrap();
        connector.attempt = 5;
        connector.server_retry = Some(Duration::from_millis(42));
        assert_eq!(connector.next_delay(), Duration::from_millis(42));
    }
}
