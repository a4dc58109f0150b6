//! Incremental decoders for the two streaming wire protocols.
//!
//! Both decoders accept raw body chunks split at arbitrary byte offsets and
//! only ever report events for frames that are complete.

mod ndjson;
mod sse_parser;

pub use ndjson::NdjsonDecoder;
pub use sse_parser::SseDecoder;

use bytes::Bytes;
use futures_util::Stream;
use std::fmt;

use super::error::{DecodeError, JobError};

/// One logical frame of a streaming response, reduced to what a job needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// New text carried by this frame (not the cumulative total).
    Content(String),
    /// The backend reported an error.
    Error(String),
    /// The backend signalled the end of the stream.
    Done,
}

/// Turns body chunks into [`StreamEvent`]s.
pub trait FrameDecoder: Send {
    /// Buffers `chunk` and returns the events of every frame it completed.
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, DecodeError>;

    /// Called once the body has ended; flushes whatever the buffer still holds.
    fn finish(&mut self) -> Result<Vec<StreamEvent>, DecodeError>;
}

/// Converts a raw response body into a stream of decoded events.
///
/// Handles buffering and end-of-body flushing. A transport error ends the
/// stream with [`JobError::IncompleteStream`]; a decode error ends it with
/// the matching [`JobError`].
pub fn decode_events<S, E>(
    body: S,
    mut decoder: Box<dyn FrameDecoder>,
) -> impl Stream<Item = Result<StreamEvent, JobError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    async_stream::stream! {
        use futures_util::StreamExt;

        let mut body = std::pin::pin!(body);

        while let Some(chunk_result) = body.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(JobError::IncompleteStream(e.to_string()));
                    return;
                }
            };

            match decoder.feed(&chunk) {
                Ok(events) => {
                    for event in events {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }
        }

        match decoder.finish() {
            Ok(events) => {
                for event in events {
                    yield Ok(event);
                }
            }
            Err(e) => yield Err(e.into()),
        }
    }
}

/// Removes and returns the bytes up to (not including) the first `\n`.
fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=end).collect();
    line.pop();
    Some(line)
}

/// Shortens frame text for error messages.
fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 80;
    if text.chars().count() <= MAX_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_CHARS).collect();
    format!("{head}...")
}
