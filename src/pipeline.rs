//! 流式帧解析：把逐行事件流还原为内容增量。
//!
//! # Stream frame parsing
//!
//! Turns the line-oriented view of an event stream into content deltas.
//! The parser is deliberately permissive on noise and strict only on the
//! terminal sentinel and on well-formed data frames: upstream backends
//! interleave keep-alives, comments and role-only chunks that must never
//! abort a stream.
//!
//! ```text
//! lines ──▶ parse_line ──▶ Content(delta) │ Done │ Ignored
//!                 │
//!                 └──▶ content_stream: skip Ignored, stop at Done
//! ```

use crate::error::Error;
use crate::wire::StreamChunk;
use crate::BoxStream;
use futures::StreamExt;
use tracing::debug;

/// Reserved prefix of a data line.
pub const DATA_PREFIX: &str = "data:";

/// Terminal sentinel value closing a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One parsed unit of the event stream. Produced one line at a time; never
/// buffered beyond the current line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A text delta to append to the accumulated result.
    Content(String),
    /// End of stream; no further lines are read.
    Done,
    /// Blank line, comment, unknown prefix, or an undecodable data frame.
    Ignored,
}

/// Classify a single line.
///
/// Priority order: sentinel, then well-formed data frame, then noise. A data
/// frame that fails to decode is skipped, not fatal; the skip is surfaced
/// only as a debug log (frame-decode failure rates are a monitoring signal,
/// not an error).
pub fn parse_line(line: &str) -> StreamFrame {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return StreamFrame::Ignored;
    }

    let Some(rest) = trimmed.strip_prefix(DATA_PREFIX) else {
        return StreamFrame::Ignored;
    };
    let payload = rest.trim();

    if payload == DONE_SENTINEL {
        return StreamFrame::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => match chunk.content() {
            Some(delta) => StreamFrame::Content(delta),
            // Well-formed chunk without a content delta (role announcements,
            // finish_reason-only chunks).
            None => StreamFrame::Ignored,
        },
        Err(e) => {
            debug!(error = %e, "skipping undecodable stream frame");
            StreamFrame::Ignored
        }
    }
}

/// Fold a line stream into a stream of content deltas.
///
/// - `Ignored` frames are dropped.
/// - `Done` terminates consumption immediately; later lines are never read.
/// - A terminated stream that produced no delta ends in `EmptyResponse` if
///   data framing was seen at all, `InvalidResponse` otherwise (the body was
///   not an event stream to begin with).
/// - Transport errors pass through and terminate the stream.
pub fn content_stream(lines: BoxStream<'static, String>) -> BoxStream<'static, String> {
    struct State {
        lines: BoxStream<'static, String>,
        emitted_any: bool,
        saw_framing: bool,
        finished: bool,
    }

    let state = State {
        lines,
        emitted_any: false,
        saw_framing: false,
        finished: false,
    };

    let stream = futures::stream::unfold(state, |mut st| async move {
        loop {
            if st.finished {
                return None;
            }

            match st.lines.next().await {
                Some(Ok(line)) => {
                    if line.trim_start().starts_with(DATA_PREFIX) {
                        st.saw_framing = true;
                    }
                    match parse_line(&line) {
                        StreamFrame::Content(delta) => {
                            st.emitted_any = true;
                            return Some((Ok(delta), st));
                        }
                        StreamFrame::Done => {
                            st.finished = true;
                            if st.emitted_any {
                                return None;
                            }
                            return Some((Err(Error::EmptyResponse), st));
                        }
                        StreamFrame::Ignored => continue,
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e), st));
                }
                None => {
                    // Connection closed without an explicit sentinel; legal
                    // as long as content was delivered.
                    st.finished = true;
                    if st.emitted_any {
                        return None;
                    }
                    let err = if st.saw_framing {
                        Error::EmptyResponse
                    } else {
                        Error::InvalidResponse
                    };
                    return Some((Err(err), st));
                }
            }
        }
    });

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: Vec<&'static str>) -> BoxStream<'static, String> {
        Box::pin(futures::stream::iter(
            input.into_iter().map(|l| Ok(l.to_string())),
        ))
    }

    async fn collect(input: Vec<&'static str>) -> Vec<crate::Result<String>> {
        content_stream(lines(input)).collect().await
    }

    #[test]
    fn sentinel_decodes_to_done() {
        assert_eq!(parse_line("data: [DONE]"), StreamFrame::Done);
        assert_eq!(parse_line("data:[DONE]"), StreamFrame::Done);
    }

    #[test]
    fn data_frame_decodes_delta_content() {
        let frame = parse_line(r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#);
        assert_eq!(frame, StreamFrame::Content("Hel".to_string()));
    }

    #[test]
    fn noise_is_ignored() {
        assert_eq!(parse_line(""), StreamFrame::Ignored);
        assert_eq!(parse_line(": keep-alive"), StreamFrame::Ignored);
        assert_eq!(parse_line("event: message"), StreamFrame::Ignored);
        // Role-only chunk: well-formed, no content.
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            StreamFrame::Ignored
        );
        // Malformed JSON is skipped, never fatal.
        assert_eq!(parse_line("data: {not json"), StreamFrame::Ignored);
    }

    #[tokio::test]
    async fn deltas_concatenate_in_arrival_order() {
        let out = collect(vec![
            r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
            "data: [DONE]",
        ])
        .await;

        let text: String = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn malformed_frame_between_valid_ones_is_skipped() {
        let out = collect(vec![
            r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
            "data: {malformed",
            r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
            "data: [DONE]",
        ])
        .await;

        let text: String = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn lines_after_done_are_never_processed() {
        let out = collect(vec![
            r#"data: {"choices":[{"delta":{"content":"a"}}]}"#,
            "data: [DONE]",
            r#"data: {"choices":[{"delta":{"content":"never"}}]}"#,
        ])
        .await;

        let text: String = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(text, "a");
    }

    #[tokio::test]
    async fn zero_deltas_before_done_is_empty_response() {
        let out = collect(vec![
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            "data: [DONE]",
        ])
        .await;

        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(Error::EmptyResponse)));
    }

    #[tokio::test]
    async fn non_event_stream_body_is_invalid_response() {
        let out = collect(vec![r#"{"error": "nope"}"#]).await;

        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(Error::InvalidResponse)));
    }

    #[tokio::test]
    async fn eof_after_content_without_sentinel_is_success() {
        let out = collect(vec![r#"data: {"choices":[{"delta":{"content":"ok"}}]}"#]).await;

        let text: String = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(text, "ok");
    }
}
