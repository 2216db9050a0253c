//! # SSE Framing
//!
//! Turns a chunked byte stream into server-sent event frames:
//! - Line buffering across chunk boundaries (`\n` and `\r\n`)
//! - `event`, `data`, `id` and `retry` fields, `:` comments
//! - Multi-line `data` joined with `\n`
//! - Blank line dispatches; empty data is never dispatched, but a new `id`
//!   still takes effect and is reported as [`Frame::Id`]
//!
//! A frame left incomplete when the stream ends is discarded.

use std::pin::Pin;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::trace;

/// Event name used when a frame carries no `event` field.
pub const DEFAULT_EVENT: &str = "message";

/// One dispatched event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name, [`DEFAULT_EVENT`] when unnamed.
    pub event: String,
    /// Payload, lines joined with `\n`.
    pub data: String,
    /// Last event id seen on this stream, if any.
    pub id: Option<String>,
}

/// Decoder output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A dispatched event.
    Event(SseEvent),
    /// The last event id changed on a frame that carried no data.
    Id(String),
    /// Server asked for a new reconnection delay.
    Retry(Duration),
}

/// Line-level decoder state.
#[derive(Debug, Default)]
pub struct SseDecoder {
    event: String,
    data: String,
    last_event_id: Option<String>,
    id_changed: bool,
}

impl SseDecoder {
    /// Create a decoder with no pending frame and no event id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line without its terminator.
    pub fn feed_line(&mut self, line: &str) -> Option<Frame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => value.clone_into(&mut self.event),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "id" if !value.contains('\0') => {
                self.last_event_id = Some(value.to_owned());
                self.id_changed = true;
            }
            "retry" if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
                return value
                    .parse::<u64>()
                    .ok()
                    .map(|ms| Frame::Retry(Duration::from_millis(ms)));
            }
            other => trace!(field = other, "ignoring sse field"),
        }
        None
    }

    /// Last event id seen, kept across frames.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    fn dispatch(&mut self) -> Option<Frame> {
        let event = std::mem::take(&mut self.event);
        let id_changed = std::mem::take(&mut self.id_changed);
        if self.data.is_empty() {
            return if id_changed {
                self.last_event_id.clone().map(Frame::Id)
            } else {
                None
            };
        }
        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            let _ = data.pop();
        }
        Some(Frame::Event(SseEvent {
            event: if event.is_empty() {
                DEFAULT_EVENT.to_owned()
            } else {
                event
            },
            data,
            id: self.last_event_id.clone(),
        }))
    }
}

/// Decode SSE frames from a byte stream.
///
/// A read error is yielded once and ends the stream.
pub fn sse_frames<S, E>(byte_stream: S) -> impl Stream<Item = Result<Frame, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    futures::stream::unfold(
        (
            Box::pin(byte_stream),
            BytesMut::with_capacity(8192),
            SseDecoder::new(),
            false,
        ),
        |(mut stream, mut buffer, mut decoder, done): (Pin<Box<S>>, _, _, _)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let line = String::from_utf8_lossy(&line_bytes);
                    if let Some(frame) = decoder.feed_line(&line) {
                        return Some((Ok(frame), (stream, buffer, decoder, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => return Some((Err(e), (stream, buffer, decoder, true))),
                    None => {
                        if !buffer.is_empty() {
                            trace!(bytes = buffer.len(), "discarding incomplete sse frame");
                        }
                        return None;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(data: &str) -> Frame {
        Frame::Event(SseEvent {
            event: DEFAULT_EVENT.into(),
            data: data.into(),
            id: None,
        })
    }

    async fn collect(chunks: Vec<&'static str>) -> Vec<Frame> {
        let stream = futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, std::io::Error>(Bytes::from(c))),
        );
        sse_frames(stream)
            .map(|item| item.unwrap())
            .collect::<Vec<_>>()
            .await
    }

    // ── SseDecoder ───────────────────────────────────────────────────────

    #[test]
    fn data_line_dispatches_on_blank_line() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed_line(r#"data: {"type":"status"}"#), None);
        assert_eq!(decoder.feed_line(""), Some(event(r#"{"type":"status"}"#)));
    }

    #[test]
    fn only_one_leading_space_is_stripped() {
        let mut decoder = SseDecoder::new();
        let _ = decoder.feed_line("data:  two");
        assert_eq!(decoder.feed_line(""), Some(event(" two")));
        let _ = decoder.feed_line("data:none");
        assert_eq!(decoder.feed_line(""), Some(event("none")));
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let _ = decoder.feed_line("data: first");
        let _ = decoder.feed_line("data: second");
        assert_eq!(decoder.feed_line(""), Some(event("first\nsecond")));
    }

    #[test]
    fn comments_and_unknown_fields_are_ignored() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed_line(": keepalive"), None);
        assert_eq!(decoder.feed_line("foo: bar"), None);
        assert_eq!(decoder.feed_line(""), None);
    }

    #[test]
    fn blank_line_without_data_does_not_dispatch() {
        let mut decoder = SseDecoder::new();
        let _ = decoder.feed_line("event: ping");
        assert_eq!(decoder.feed_line(""), None);
        // the name does not leak into the next frame
        let _ = decoder.feed_line("data: x");
        assert_eq!(decoder.feed_line(""), Some(event("x")));
    }

    #[test]
    fn empty_data_field_still_dispatches() {
        let mut decoder = SseDecoder::new();
        let _ = decoder.feed_line("data");
        assert_eq!(decoder.feed_line(""), Some(event("")));
    }

    #[test]
    fn named_event_keeps_its_name() {
        let mut decoder = SseDecoder::new();
        let _ = decoder.feed_line("event: heartbeat");
        let _ = decoder.feed_line("data: {}");
        let Some(Frame::Event(ev)) = decoder.feed_line("") else {
            panic!("expected event");
        };
        assert_eq!(ev.event, "heartbeat");
    }

    #[test]
    fn id_persists_across_frames() {
        let mut decoder = SseDecoder::new();
        let _ = decoder.feed_line("id: 7");
        let _ = decoder.feed_line("data: a");
        let Some(Frame::Event(first)) = decoder.feed_line("") else {
            panic!("expected event");
        };
        assert_eq!(first.id.as_deref(), Some("7"));

        let _ = decoder.feed_line("data: b");
        let Some(Frame::Event(second)) = decoder.feed_line("") else {
            panic!("expected event");
        };
        assert_eq!(second.id.as_deref(), Some("7"));
        assert_eq!(decoder.last_event_id(), Some("7"));
    }

    #[test]
    fn id_only_frame_reports_the_new_id() {
        let mut decoder = SseDecoder::new();
        let _ = decoder.feed_line("id: 5");
        assert_eq!(decoder.feed_line(""), Some(Frame::Id("5".into())));
        assert_eq!(decoder.last_event_id(), Some("5"));

        // reported once, not on every later blank line
        assert_eq!(decoder.feed_line(""), None);

        let _ = decoder.feed_line("id");
        assert_eq!(decoder.feed_line(""), Some(Frame::Id(String::new())));
    }

    #[test]
    fn id_with_nul_is_ignored() {
        let mut decoder = SseDecoder::new();
        let _ = decoder.feed_line("id: 1");
        let _ = decoder.feed_line("id: 2\0");
        assert_eq!(decoder.last_event_id(), Some("1"));
    }

    #[test]
    fn retry_requires_digits() {
        let mut decoder = SseDecoder::new();
        assert_eq!(
            decoder.feed_line("retry: 2500"),
            Some(Frame::Retry(Duration::from_millis(2500)))
        );
        assert_eq!(decoder.feed_line("retry: 2.5"), None);
        assert_eq!(decoder.feed_line("retry:"), None);
        assert_eq!(decoder.feed_line("retry: -1"), None);
    }

    // ── sse_frames ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn frames_from_single_chunk() {
        let frames = collect(vec!["data: {\"a\":1}\n\ndata: {\"b\":2}\n\n"]).await;
        assert_eq!(frames, vec![event("{\"a\":1}"), event("{\"b\":2}")]);
    }

    #[tokio::test]
    async fn frames_split_across_chunks() {
        let frames = collect(vec!["data: {\"par", "tial\":true}\n", "\n"]).await;
        assert_eq!(frames, vec![event("{\"partial\":true}")]);
    }

    #[tokio::test]
    async fn frames_with_crlf() {
        let frames = collect(vec!["data: {\"cr\":true}\r\n\r\n"]).await;
        assert_eq!(frames, vec![event("{\"cr\":true}")]);
    }

    #[tokio::test]
    async fn retry_frame_is_yielded_in_order() {
        let frames = collect(vec!["retry: 10\ndata: x\n\n"]).await;
        assert_eq!(
            frames,
            vec![Frame::Retry(Duration::from_millis(10)), event("x")]
        );
    }

    #[tokio::test]
    async fn id_only_frame_is_yielded_between_events() {
        let frames = collect(vec!["data: a\n\n: ping\nid: 9\n\ndata: b\n\n"]).await;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1], Frame::Id("9".into()));
        let Frame::Event(last) = &frames[2] else {
            panic!("expected event");
        };
        assert_eq!(last.id.as_deref(), Some("9"));
    }

    #[tokio::test]
    async fn trailing_incomplete_frame_is_discarded() {
        let frames = collect(vec!["data: done\n\ndata: {\"trailing\":true}"]).await;
        assert_eq!(frames, vec![event("done")]);

        let frames = collect(vec!["data: no blank line\n"]).await;
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn empty_stream_yields_nothing() {
        assert!(collect(vec![]).await.is_empty());
    }

    #[tokio::test]
    async fn read_error_is_yielded_then_stream_ends() {
        let chunks = vec![
            Ok(Bytes::from("data: a\n\n")),
            Err("reset"),
            Ok(Bytes::from("data: b\n\n")),
        ];
        let items: Vec<_> = sse_frames(futures::stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok(event("a")));
        assert_eq!(items[1], Err("reset"));
    }
}
