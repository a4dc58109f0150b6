//! Server-Sent Events (SSE) decoder for OpenAI-compatible streaming responses.
//!
//! Frames are separated by a blank line. Only `data:` lines are relevant:
//! their payload is either a chat completion chunk or the `[DONE]` sentinel.

use serde::Deserialize;

use super::{FrameDecoder, StreamEvent};
use crate::translation::error::DecodeError;

const DONE_SENTINEL: &str = "[DONE]";

/// Response structure for streaming chat completions.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<UpstreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Servers disagree on the error shape: some send an object, some a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UpstreamError {
    Object { message: Option<String> },
    Text(String),
}

impl UpstreamError {
    fn into_message(self) -> String {
        match self {
            Self::Object {
                message: Some(message),
            } => message,
            Self::Object { message: None } => "unknown upstream error".to_string(),
            Self::Text(text) => text,
        }
    }
}

/// Decoder for SSE chat completion streams.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    finished: bool,
}

impl SseDecoder {
    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a terminal frame has been consumed.
    fn consume_frame(&mut self, frame: &[u8], events: &mut Vec<StreamEvent>) -> bool {
        let text = String::from_utf8_lossy(frame);
        let data: Vec<&str> = text.lines().filter_map(data_value).collect();
        if data.is_empty() {
            return false;
        }

        let payload = data.join("\n");
        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            events.push(StreamEvent::Done);
            return true;
        }

        parse_payload(payload, events)
    }

    fn close(&mut self) {
        self.finished = true;
        self.pending.clear();
    }
}

/// Extracts the value of a `data:` line; other fields and comments yield `None`.
fn data_value(line: &str) -> Option<&str> {
    let value = line.strip_prefix("data:")?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}

/// Parses a JSON payload. Returns `true` when the payload reported an error.
fn parse_payload(payload: &str, events: &mut Vec<StreamEvent>) -> bool {
    let response = match serde_json::from_str::<StreamResponse>(payload) {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(error = %err, payload = %super::preview(payload), "skipping SSE data line");
            return false;
        }
    };

    let content: String = response
        .choices
        .into_iter()
        .filter_map(|c| c.delta.and_then(|d| d.content))
        .filter(|c| !c.is_empty())
        .collect();

    if !content.is_empty() {
        events.push(StreamEvent::Content(content));
    }

    if let Some(error) = response.error {
        events.push(StreamEvent::Error(error.into_message()));
        return true;
    }
    false
}

/// Finds the end of the first frame: the index of the `\n\n` delimiter.
fn frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

impl FrameDecoder for SseDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, DecodeError> {
        if self.finished {
            return Ok(Vec::new());
        }
        // CR never appears unescaped inside a JSON payload, so dropping it
        // turns CRLF framing into LF framing regardless of chunk boundaries.
        self.pending
            .extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = frame_end(&self.pending) {
            let frame: Vec<u8> = self.pending.drain(..end + 2).collect();
            if self.consume_frame(&frame[..end], &mut events) {
                self.close();
                break;
            }
        }
        Ok(events)
    }

    fn finish(&mut self) -> Result<Vec<StreamEvent>, DecodeError> {
        if self.finished {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        let tail = std::mem::take(&mut self.pending);
        // A final frame missing only its blank line is still complete, but a
        // line cut off mid-way is not.
        let (complete, dropped) = match tail.iter().rposition(|&b| b == b'\n') {
            Some(last_newline) => (&tail[..last_newline], tail.len() - last_newline - 1),
            None => (&[][..], tail.len()),
        };
        if dropped > 0 {
            tracing::debug!(dropped, "discarding unterminated SSE line");
        }
        self.consume_frame(complete, &mut events);
        self.close();
        Ok(events)
    }
}
