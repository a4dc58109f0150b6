//! Newline-delimited JSON decoder for the local generation protocol.
//!
//! Each line of the body is one JSON object such as
//! `{"response":"Hola","done":false}`. The final object carries
//! `"done":true`; failures carry an `"error"` message.

use serde::Deserialize;

use super::{FrameDecoder, StreamEvent, take_line};
use crate::translation::error::DecodeError;

/// Fields of a generate frame that the decoder acts on. Everything else the
/// server sends (timings, token counts, context) is ignored.
#[derive(Debug, Deserialize)]
struct GenerateFrame {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Decoder for NDJSON generate streams.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    pending: Vec<u8>,
    finished: bool,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a terminal frame has been consumed.
    fn consume_line(line: &[u8], events: &mut Vec<StreamEvent>) -> Result<bool, serde_json::Error> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        let frame = serde_json::from_str::<GenerateFrame>(text)?;
        Ok(emit(frame, events))
    }

    fn close(&mut self) {
        self.finished = true;
        self.pending.clear();
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn malformed(err: &serde_json::Error, line: &[u8]) -> DecodeError {
    DecodeError::Malformed(format!(
        "{err} in line {}",
        super::preview(&String::from_utf8_lossy(line))
    ))
}

fn emit(frame: GenerateFrame, events: &mut Vec<StreamEvent>) -> bool {
    if let Some(text) = frame.response.filter(|t| !t.is_empty()) {
        events.push(StreamEvent::Content(text));
    }
    if let Some(message) = frame.error {
        events.push(StreamEvent::Error(message));
        return true;
    }
    if frame.done == Some(true) {
        events.push(StreamEvent::Done);
        return true;
    }
    false
}

impl FrameDecoder for NdjsonDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, DecodeError> {
        if self.finished {
            return Ok(Vec::new());
        }
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(line) = take_line(&mut self.pending) {
            match Self::consume_line(&line, &mut events) {
                Ok(false) => {}
                Ok(true) => {
                    self.close();
                    break;
                }
                // A newline-terminated line is complete no matter how the
                // body was chunked, so any parse failure here is fatal.
                Err(err) => {
                    self.close();
                    return Err(malformed(&err, &line));
                }
            }
        }
        Ok(events)
    }

    fn finish(&mut self) -> Result<Vec<StreamEvent>, DecodeError> {
        if self.finished {
            return Ok(Vec::new());
        }

        let tail = std::mem::take(&mut self.pending);
        self.close();

        let mut events = Vec::new();
        match Self::consume_line(&tail, &mut events) {
            Ok(_) => Ok(events),
            Err(err) if err.is_eof() => {
                tracing::trace!(len = tail.len(), "body ended inside an NDJSON frame");
                Err(DecodeError::Truncated(super::preview(&String::from_utf8_lossy(
                    &tail,
                ))))
            }
            Err(err) => Err(malformed(&err, &tail)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const HOLA: &[u8] = b"{\"response\":\"Hola\"}\n{\"response\":\" mundo\"}\n{\"done\":true}\n";

    fn decode_chunks(chunks: &[&[u8]]) -> Result<Vec<StreamEvent>, DecodeError> {
        let mut decoder = NdjsonDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.feed(chunk)?);
        }
        events.extend(decoder.finish()?);
        Ok(events)
    }

    fn hola_events() -> Vec<StreamEvent> {
        vec![
            StreamEvent::Content("Hola".to_string()),
            StreamEvent::Content(" mundo".to_string()),
            StreamEvent::Done,
        ]
    }

    #[test]
    fn test_single_chunk() {
        assert_eq!(decode_chunks(&[HOLA]).unwrap(), hola_events());
    }

    #[test]
    fn test_every_three_way_split_yields_same_events() {
        for i in 0..=HOLA.len() {
            for j in i..=HOLA.len() {
                let chunks = [&HOLA[..i], &HOLA[i..j], &HOLA[j..]];
                assert_eq!(
                    decode_chunks(&chunks).unwrap(),
                    hola_events(),
                    "split at {i}/{j}"
                );
            }
        }
    }

    #[test]
    fn test_byte_by_byte_multibyte_text() {
        let body = "{\"response\":\"こんにちは\"}\n{\"response\":\"🌍\",\"done\":true}\n";
        let chunks: Vec<&[u8]> = body.as_bytes().chunks(1).collect();
        assert_eq!(
            decode_chunks(&chunks).unwrap(),
            vec![
                StreamEvent::Content("こんにちは".to_string()),
                StreamEvent::Content("🌍".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[test]
    fn test_incomplete_fragment_stays_pending() {
        let mut decoder = NdjsonDecoder::new();
        let events = decoder.feed(b"{\"resp").unwrap();
        assert!(events.is_empty());
        assert_eq!(decoder.pending_len(), 6);

        let events = decoder.feed(b"onse\":\"ok\"}\n").unwrap();
        assert_eq!(events, vec![StreamEvent::Content("ok".to_string())]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_status_frames_are_silent() {
        let body = b"{\"status\":\"loading model\"}\n{\"response\":\"\",\"done\":false}\n";
        assert!(decode_chunks(&[body]).unwrap().is_empty());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let body = b"\n  \n{\"response\":\"a\"}\n\n";
        assert_eq!(
            decode_chunks(&[body]).unwrap(),
            vec![StreamEvent::Content("a".to_string())]
        );
    }

    #[test]
    fn test_error_frame_stops_decoding() {
        let mut decoder = NdjsonDecoder::new();
        let events = decoder
            .feed(b"{\"error\":\"model not found\"}\n{\"response\":\"late\"}\n")
            .unwrap();
        assert_eq!(
            events,
            vec![StreamEvent::Error("model not found".to_string())]
        );
        assert!(decoder.feed(b"{\"response\":\"later\"}\n").unwrap().is_empty());
    }

    #[test]
    fn test_done_discards_trailing_bytes() {
        let mut decoder = NdjsonDecoder::new();
        let events = decoder.feed(b"{\"done\":true}\n{\"respo").unwrap();
        assert_eq!(events, vec![StreamEvent::Done]);
        assert_eq!(decoder.pending_len(), 0);
        assert!(decoder.finish().unwrap().is_empty());
    }

    #[test]
    fn test_content_and_done_in_same_frame() {
        let events = decode_chunks(&[b"{\"response\":\"fin\",\"done\":true}\n"]).unwrap();
        assert_eq!(
            events,
            vec![StreamEvent::Content("fin".to_string()), StreamEvent::Done]
        );
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let result = decode_chunks(&[b"{\"response\":\"a\"}\nnot json\n"]);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_incomplete_line_followed_by_more_lines_is_fatal() {
        let result = decode_chunks(&[b"{\"response\":\n{\"response\":\"b\"}\n"]);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_object_broken_across_lines_is_malformed_at_every_split() {
        let body: &[u8] = b"{\"response\":\n\"x\"}\n";
        assert!(matches!(decode_chunks(&[body]), Err(DecodeError::Malformed(_))));
        for i in 0..=body.len() {
            let result = decode_chunks(&[&body[..i], &body[i..]]);
            assert!(
                matches!(result, Err(DecodeError::Malformed(_))),
                "split at {i}: {result:?}"
            );
        }
    }

    #[test]
    fn test_malformed_unterminated_tail_at_finish() {
        let result = decode_chunks(&[b"{\"response\":\"a\"}\nnot json"]);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_unterminated_final_line_is_flushed() {
        let events = decode_chunks(&[b"{\"response\":\"a\"}\n{\"done\":true}"]).unwrap();
        assert_eq!(
            events,
            vec![StreamEvent::Content("a".to_string()), StreamEvent::Done]
        );
    }

    #[test]
    fn test_truncated_tail_at_finish() {
        let result = decode_chunks(&[b"{\"response\":\"a\"}\n{\"resp"]);
        assert!(matches!(result, Err(DecodeError::Truncated(_))));
    }

    #[test]
    fn test_end_without_done_is_clean() {
        let events = decode_chunks(&[b"{\"response\":\"a\"}\n"]).unwrap();
        assert_eq!(events, vec![StreamEvent::Content("a".to_string())]);
    }
}
