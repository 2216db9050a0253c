//! Offline replay of recorded raw messages.

use std::collections::BTreeMap;
use std::fmt;

use beacon_core::{DiagnosticSink, Dispatcher, FieldBoard, MemorySink};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Outcome of one replay run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Non-blank lines read.
    pub messages: usize,
    pub applied: usize,
    /// Diagnostic count per error kind.
    pub diagnostics: BTreeMap<&'static str, usize>,
}

impl ReplaySummary {
    pub fn failed(&self) -> usize {
        self.diagnostics.values().sum()
    }
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} messages, {} applied, {} rejected",
            self.messages,
            self.applied,
            self.failed()
        )?;
        for (kind, count) in &self.diagnostics {
            write!(f, "\n  {kind}: {count}")?;
        }
        Ok(())
    }
}

/// Dispatch every non-blank line of `reader` into `board`, one message per
/// line. Diagnostics go to `sink` as well as into the summary.
///
/// Lines are decoded lossily, so invalid UTF-8 fails only its own message.
pub async fn replay_lines<R, S>(
    mut reader: R,
    sink: S,
    board: &mut FieldBoard,
) -> std::io::Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
    S: DiagnosticSink,
{
    let collected = MemorySink::new();
    let dispatcher = Dispatcher::new((sink, &collected));
    let mut summary = ReplaySummary::default();

    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let raw = line.trim_end_matches(['\n', '\r']);
        if raw.trim().is_empty() {
            continue;
        }
        summary.messages += 1;
        if dispatcher.dispatch(raw, board).is_some() {
            summary.applied += 1;
        }
    }

    for record in collected.records() {
        *summary.diagnostics.entry(record.error_kind()).or_default() += 1;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use beacon_core::BindingTable;

    use super::*;

    const RECORDING: &str = concat!(
        "{\"type\":\"status\",\"data\":{\"status\":\"ONLINE\"}}\n",
        "\n",
        "not json\r\n",
        "{\"type\":\"agent\",\"data\":{\"id\":\"A1\",\"symbol\":\"VOY\",\"headquarters\":\"X1-HQ\",\"credits\":1000,\"faction\":\"COSMIC\",\"shipCount\":3}}\n",
        "{\"type\":\"unknown_kind\",\"data\":{}}\n",
        "{\"type\":\"contract\"}\n",
        "{\"type\":\"contract\",\"data\":{\"id\":\"C-7\"}}",
    );

    #[tokio::test]
    async fn replay_applies_good_lines_and_counts_failures() {
        let mut board = FieldBoard::from_table(&BindingTable::builtin());
        let sink = MemorySink::new();

        let summary = replay_lines(RECORDING.as_bytes(), &sink, &mut board)
            .await
            .unwrap();

        assert_eq!(summary.messages, 6);
        assert_eq!(summary.applied, 3);
        assert_eq!(summary.failed(), 3);
        assert_eq!(summary.diagnostics.get("decode"), Some(&1));
        assert_eq!(summary.diagnostics.get("unknown_type"), Some(&1));
        assert_eq!(summary.diagnostics.get("missing_payload"), Some(&1));
        assert_eq!(sink.len(), 3);

        assert_eq!(board.text("[data-status]"), Some("ONLINE"));
        assert_eq!(board.text("[data-agent-credits]"), Some("1000"));
        assert_eq!(board.text("[data-contract-id]"), Some("C-7"));
    }

    #[tokio::test]
    async fn invalid_utf8_line_fails_only_itself() {
        let mut input = b"{\"type\":\"status\",\"data\":{\"status\":\"ONLINE\"}}\n".to_vec();
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(b"{\"type\":\"contract\",\"data\":{\"id\":\"C-9\"}}\n");

        let mut board = FieldBoard::from_table(&BindingTable::builtin());
        let sink = MemorySink::new();
        let summary = replay_lines(input.as_slice(), &sink, &mut board)
            .await
            .unwrap();

        assert_eq!(summary.messages, 3);
        assert_eq!(summary.applied, 2);
        assert_eq!(summary.diagnostics.get("decode"), Some(&1));
        assert_eq!(sink.len(), 1);
        assert_eq!(board.text("[data-status]"), Some("ONLINE"));
        assert_eq!(board.text("[data-contract-id]"), Some("C-9"));
    }

    #[tokio::test]
    async fn empty_input_is_an_empty_summary() {
        let mut board = FieldBoard::new();
        let summary = replay_lines(&b""[..], MemorySink::new(), &mut board)
            .await
            .unwrap();
        assert_eq!(summary, ReplaySummary::default());
    }

    #[test]
    fn summary_display_lists_kinds() {
        let mut summary = ReplaySummary {
            messages: 3,
            applied: 1,
            ..ReplaySummary::default()
        };
        let _ = summary.diagnostics.insert("decode", 2);
        assert_eq!(
            summary.to_string(),
            "3 messages, 1 applied, 2 rejected\n  decode: 2"
        );
    }
}
