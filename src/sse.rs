//! Server-Sent Events (SSE) processing for streaming chat completions.
//!
//! This module turns the raw byte stream of a `text/event-stream` response into a stream of
//! [`ChatCompletionChunk`]s.  Each event is a `data:` line holding one JSON chunk; the literal
//! payload `[DONE]` ends the stream.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;

use crate::observability::{STREAM_BYTES, STREAM_ERRORS};
use crate::{ChatCompletionChunk, Error, Result};

/// Payload that marks the end of a chat completion stream.
const DONE_MARKER: &str = "[DONE]";

/// One complete event pulled off the buffer.
#[derive(Debug)]
enum Frame {
    /// A decoded chunk, or the error decoding it.
    Chunk(Result<ChatCompletionChunk>),
    /// The `[DONE]` marker.
    Done,
    /// Comments and events without data.
    Empty,
}

/// Process a stream of bytes into a stream of chat completion chunks.
///
/// The returned stream ends at `[DONE]` or when the byte stream ends, whichever comes first.
/// Errors are yielded in place; the consumer decides whether to keep reading.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<ChatCompletionChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer = String::new();
    let pending: Vec<u8> = Vec::new();
    let done = false;

    stream::unfold(
        (stream, buffer, pending, done),
        move |(mut stream, mut buffer, mut pending, mut done)| async move {
            loop {
                if done {
                    return None;
                }

                // First check if we have a complete event in the buffer
                if let Some((frame, remaining)) = extract_frame(&buffer) {
                    buffer = remaining;
                    match frame {
                        Frame::Chunk(chunk) => {
                            if chunk.is_err() {
                                STREAM_ERRORS.click();
                            }
                            return Some((chunk, (stream, buffer, pending, done)));
                        }
                        Frame::Done => return None,
                        Frame::Empty => continue,
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        pending.extend_from_slice(&bytes);
                        // A multi-byte character may straddle two reads; keep its head pending.
                        let valid = match std::str::from_utf8(&pending).map(str::len) {
                            Ok(len) => len,
                            Err(e) if e.error_len().is_none() => e.valid_up_to(),
                            Err(e) => {
                                STREAM_ERRORS.click();
                                pending.clear();
                                return Some((
                                    Err(Error::encoding(
                                        format!("Invalid UTF-8 in stream: {e}"),
                                        Some(Box::new(e)),
                                    )),
                                    (stream, buffer, pending, done),
                                ));
                            }
                        };
                        buffer.push_str(&String::from_utf8_lossy(&pending[..valid]));
                        pending.drain(..valid);
                        if buffer.contains('\r') {
                            buffer = buffer.replace("\r\n", "\n");
                        }
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer, pending, done)));
                    }
                    None => {
                        // End of stream; a final event may lack its blank line.
                        done = true;
                        if !buffer.trim().is_empty() {
                            buffer.push_str("\n\n");
                            if let Some((Frame::Chunk(chunk), _)) = extract_frame(&buffer) {
                                return Some((chunk, (stream, String::new(), pending, done)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract a complete SSE event from a buffer string.
///
/// Events are delimited by a blank line.  Lines starting with `:` are comments and other
/// fields (`event:`, `id:`, `retry:`) carry nothing the chat stream needs.
fn extract_frame(buffer: &str) -> Option<(Frame, String)> {
    let (event_text, rest) = buffer.split_once("\n\n")?;
    let rest = rest.to_string();

    let data: Vec<&str> = event_text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    if data.is_empty() {
        return Some((Frame::Empty, rest));
    }
    let data = data.join("\n");
    if data.trim() == DONE_MARKER {
        return Some((Frame::Done, rest));
    }
    Some((Frame::Chunk(parse_chunk(&data)), rest))
}

/// Parse the data of one event.
///
/// The server reports failures that happen after the response headers as an event whose
/// payload is an `error` object.
fn parse_chunk(data: &str) -> Result<ChatCompletionChunk> {
    let value: Value = serde_json::from_str(data).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })?;
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown stream error")
            .to_string();
        let error_type = error
            .get("type")
            .and_then(Value::as_str)
            .map(String::from);
        return Err(Error::api(500, error_type, message, None));
    }
    serde_json::from_value(value).map_err(|e| {
        Error::serialization(
            format!("Failed to parse chunk: {e}"),
            Some(Box::new(e)),
        )
    })
}
