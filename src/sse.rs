//! Server-Sent Events (SSE) processing for streaming chat completions.
//!
//! This module turns the raw byte stream of a `chat/completions` response into
//! a stream of text fragments. Events are separated by a blank line and carry
//! one `data:` payload: a JSON chunk, or `[DONE]` to end the reply.

use std::time::Instant;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_FRAGMENTS, STREAM_TTFB};
use crate::types::ChatCompletionChunk;
use crate::{Error, Result};

/// What one complete SSE event means for the reply.
#[derive(Debug)]
enum Event {
    /// A text fragment to emit.
    Fragment(String),
    /// An event with nothing to show (role-only delta, comment, keep-alive).
    Skip,
    /// `data: [DONE]`.
    Done,
    /// A malformed or error event.
    Failed(Error),
}

/// Process a stream of bytes into a stream of text fragments.
///
/// The returned stream ends after `[DONE]` or when the connection closes,
/// whichever comes first. A transport error, invalid UTF-8, malformed JSON or
/// an in-stream error object is yielded as an `Err` item.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });
    fragments(Box::pin(stream))
}

/// Decode fragments from an already error-mapped byte stream.
pub(crate) fn fragments<S>(stream: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<Bytes>> + Unpin + Send + 'static,
{
    let state = Decoder {
        stream,
        buffer: String::new(),
        pending: Vec::new(),
        started: Instant::now(),
        first_fragment: true,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            // First check if we have a complete event in the buffer
            if let Some((event, remaining)) = extract_event(&state.buffer) {
                state.buffer = remaining;
                match event {
                    Event::Fragment(text) => {
                        state.record_fragment();
                        return Some((Ok(text), state));
                    }
                    Event::Skip => continue,
                    Event::Done => {
                        state.finished = true;
                        return None;
                    }
                    Event::Failed(err) => {
                        STREAM_ERRORS.click();
                        return Some((Err(err), state));
                    }
                }
            }

            // Read more data
            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state.pending.extend_from_slice(&bytes);
                    match drain_utf8(&mut state.pending) {
                        Ok(mut text) => {
                            // A trailing CR may be the first half of a CRLF.
                            if text.ends_with('\r') {
                                text.pop();
                                state.pending.insert(0, b'\r');
                            }
                            state.buffer.push_str(&normalize_newlines(&text));
                        }
                        Err(err) => {
                            STREAM_ERRORS.click();
                            state.finished = true;
                            return Some((Err(err), state));
                        }
                    }
                }
                Some(Err(err)) => {
                    STREAM_ERRORS.click();
                    state.finished = true;
                    return Some((Err(err), state));
                }
                None => {
                    // End of stream; a final event may lack its blank line.
                    state.finished = true;
                    if state.buffer.trim().is_empty() {
                        return None;
                    }
                    let tail = format!("{}\n\n", std::mem::take(&mut state.buffer));
                    return match extract_event(&tail) {
                        Some((Event::Fragment(text), _)) => {
                            state.record_fragment();
                            Some((Ok(text), state))
                        }
                        Some((Event::Failed(err), _)) => {
                            STREAM_ERRORS.click();
                            Some((Err(err), state))
                        }
                        _ => None,
                    };
                }
            }
        }
    })
}

struct Decoder<S> {
    stream: S,
    buffer: String,
    pending: Vec<u8>,
    started: Instant,
    first_fragment: bool,
    finished: bool,
}

impl<S> Decoder<S> {
    fn record_fragment(&mut self) {
        if self.first_fragment {
            STREAM_TTFB.add(self.started.elapsed().as_secs_f64());
            self.first_fragment = false;
        }
        STREAM_FRAGMENTS.click();
    }
}

/// Moves the longest valid UTF-8 prefix out of `pending`.
///
/// A multi-byte character split across two network reads stays in `pending`
/// until the rest of it arrives.
fn drain_utf8(pending: &mut Vec<u8>) -> Result<String> {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            Ok(text)
        }
        Err(err) if err.error_len().is_none() => {
            let valid = err.valid_up_to();
            let rest = pending.split_off(valid);
            let text = String::from_utf8(std::mem::replace(pending, rest))
                .map_err(|e| Error::encoding(format!("Invalid UTF-8 in stream: {e}"), None))?;
            Ok(text)
        }
        Err(err) => Err(Error::encoding(
            format!("Invalid UTF-8 in stream: {err}"),
            Some(Box::new(err)),
        )),
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Extract a complete SSE event from a buffer string.
///
/// Returns `None` until the buffer holds a full event terminated by a blank line.
fn extract_event(buffer: &str) -> Option<(Event, String)> {
    let (event_text, rest) = buffer.split_once("\n\n")?;
    let rest = rest.to_string();

    // Multiple data lines in one event are joined with newlines.
    let mut data: Option<String> = None;
    for line in event_text.lines() {
        let Some(value) = line.strip_prefix("data:") else {
            // `event:`, `id:`, `retry:` and `:` comments carry nothing we use.
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    let event = match data.as_deref().map(str::trim) {
        None | Some("") => Event::Skip,
        Some("[DONE]") => Event::Done,
        Some(json) => parse_chunk(json),
    };
    Some((event, rest))
}

fn parse_chunk(json: &str) -> Event {
    match serde_json::from_str::<ChatCompletionChunk>(json) {
        Ok(chunk) => {
            if let Some(detail) = chunk.error {
                let message = detail
                    .message
                    .clone()
                    .unwrap_or_else(|| "error reported in stream".to_string());
                return Event::Failed(Error::api(
                    500,
                    detail.error_type.clone().or_else(|| detail.code_str()),
                    message,
                    None,
                ));
            }
            match chunk.text() {
                Some(text) => Event::Fragment(text.to_string()),
                None => Event::Skip,
            }
        }
        Err(e) => Event::Failed(Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )),
    }
}
