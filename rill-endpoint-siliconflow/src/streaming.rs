//! SSE streaming support for the chat-completions API.
//!
//! Decodes the Server-Sent Events line protocol into [`StreamEvent`]s.
//! The format is one `data:` line per event:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hi"}}]}
//!
//! data: {"choices":[{"delta":{"content":" there"}}]}
//!
//! data: [DONE]
//! ```

use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::Response;
use rill_types::{StreamEvent, StreamHandle, TransportError};

use crate::error::map_reqwest_error;

/// The SSE event-line prefix.
const DATA_PREFIX: &str = "data: ";

/// The terminal sentinel payload.
const DONE_SENTINEL: &str = "[DONE]";

/// Wrap an HTTP response body into a [`StreamHandle`].
///
/// The handle owns the response; dropping it closes the connection.
pub(crate) fn stream_events(response: Response, timeout: Duration) -> StreamHandle {
    StreamHandle::new(parse_sse_stream(response.bytes_stream(), timeout))
}

/// Parse a raw byte stream into [`StreamEvent`]s.
///
/// Partial SSE lines are accumulated across byte chunks. The buffer
/// holds raw bytes and UTF-8 is validated per completed line, so a
/// multi-byte character split across two network chunks never fails a
/// healthy stream. The stream terminates at the `[DONE]` sentinel (no
/// further lines are read), at the end of the byte stream, or at the
/// first transport error.
fn parse_sse_stream(
    byte_stream: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    timeout: Duration,
) -> impl Stream<Item = Result<StreamEvent, TransportError>> + Send + 'static {
    async_stream::stream! {
        let mut bytes_stream = std::pin::pin!(byte_stream);
        let mut line_buf: Vec<u8> = Vec::new();

        while let Some(chunk_result) = bytes_stream.next().await {
            let chunk = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    yield Err(map_reqwest_error(e, timeout));
                    return;
                }
            };

            line_buf.extend_from_slice(&chunk);

            while let Some(newline_pos) = line_buf.iter().position(|&b| b == b'\n') {
                let mut line_bytes: Vec<u8> = line_buf.drain(..=newline_pos).collect();
                line_bytes.pop();

                let line = match String::from_utf8(line_bytes) {
                    Ok(s) => s,
                    Err(e) => {
                        yield Err(TransportError::InvalidResponse(format!(
                            "UTF-8 decode error: {e}"
                        )));
                        return;
                    }
                };

                for event in decode_line(line.trim_end_matches('\r')) {
                    let done = matches!(event, Ok(StreamEvent::Done) | Err(_));
                    yield event;
                    if done {
                        return;
                    }
                }
            }
        }

        // A trailing line without a newline can still hold a complete event
        if let Ok(trailing) = std::str::from_utf8(&line_buf)
            && !trailing.trim().is_empty()
        {
            for event in decode_line(trailing.trim()) {
                yield event;
            }
        }
    }
}

/// Decode one raw line into at most one event.
///
/// Blank lines and lines without the `data: ` prefix are ignored (not
/// errors). An unparsable payload downgrades to
/// [`StreamEvent::Malformed`] so a stray chunk never aborts an
/// otherwise-healthy stream.
fn decode_line(line: &str) -> Option<Result<StreamEvent, TransportError>> {
    let payload = line.strip_prefix(DATA_PREFIX)?;

    if payload == DONE_SENTINEL {
        return Some(Ok(StreamEvent::Done));
    }

    let json: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(_) => {
            tracing::trace!(payload, "skipping malformed stream payload");
            return Some(Ok(StreamEvent::Malformed));
        }
    };

    // An explicit error object from the endpoint fails the stream.
    if let Some(error) = json.get("error") {
        let msg = error["message"].as_str().unwrap_or("unknown stream error");
        return Some(Err(TransportError::Interrupted(msg.to_string())));
    }

    // The delta lives at choices[0].delta.content. Chunks without it
    // (role-only first chunk, finish-reason-only last chunk) produce
    // no event at all. An empty string is still a valid delta.
    json["choices"][0]["delta"]["content"]
        .as_str()
        .map(|content| Ok(StreamEvent::Delta(content.to_string())))
}
