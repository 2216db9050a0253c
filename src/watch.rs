//! Live projection of the event stream onto a field board.

use std::time::Duration;

use beacon_core::{DiagnosticSink, Dispatcher, FieldBoard};
use beacon_settings::StreamSettings;
use beacon_stream::{ReconnectConfig, StreamConfig, StreamHandler, TransportError};
use tracing::{debug, info};

/// Feeds every stream message through the dispatcher into a board.
pub struct BoardHandler<S> {
    dispatcher: Dispatcher<S>,
    board: FieldBoard,
    applied: usize,
    dropped: usize,
    transport_errors: usize,
}

impl<S: DiagnosticSink> BoardHandler<S> {
    pub fn new(dispatcher: Dispatcher<S>, board: FieldBoard) -> Self {
        Self {
            dispatcher,
            board,
            applied: 0,
            dropped: 0,
            transport_errors: 0,
        }
    }

    pub fn board(&self) -> &FieldBoard {
        &self.board
    }

    /// Messages that updated the board.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Messages rejected by the dispatcher.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn transport_errors(&self) -> usize {
        self.transport_errors
    }
}

impl<S: DiagnosticSink> StreamHandler for BoardHandler<S> {
    fn on_open(&mut self) {
        info!("event stream connected");
    }

    fn on_message(&mut self, data: &str) {
        match self.dispatcher.dispatch(data, &mut self.board) {
            Some(report) => {
                self.applied += 1;
                info!(
                    event_type = %report.kind,
                    written = report.written,
                    skipped = report.skipped,
                    "applied update"
                );
                debug!(board = %self.board, "board after update");
            }
            None => self.dropped += 1,
        }
    }

    fn on_error(&mut self, error: &TransportError) {
        self.transport_errors += 1;
        debug!(error = %error, total = self.transport_errors, "transport error");
    }
}

/// Connector config from settings.
pub fn stream_config(settings: &StreamSettings) -> StreamConfig {
    let reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(settings.reconnect.initial_delay_ms),
        max_delay: Duration::from_millis(settings.reconnect.max_delay_ms),
        jitter_factor: settings.reconnect.jitter_factor,
        max_retries: settings.reconnect.max_retries,
    };

    let mut config = StreamConfig::new(settings.url.as_str())
        .with_endpoint(settings.endpoint.as_str())
        .with_reconnect(reconnect);
    config.connect_timeout = Duration::from_millis(settings.connect_timeout_ms);
    if let Some(ms) = settings.idle_timeout_ms {
        config = config.with_idle_timeout(Duration::from_millis(ms));
    }
    config
}
