//! Error types for streaming translation jobs.

use thiserror::Error;

/// A frame decoder could not make sense of its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A complete frame violates the wire format.
    #[error("malformed frame: {0}")]
    Malformed(String),
    /// Input ended in the middle of a frame.
    #[error("stream ended inside a frame: {0}")]
    Truncated(String),
}

/// Reason a job ended in the `Failed` state.
///
/// Every variant is fatal to its own job only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The request could not be sent, or the server answered with a
    /// non-success status before any streaming began.
    #[error("request failed: {0}")]
    Transport(String),
    /// A frame could not be decoded and was not a chunk-boundary artifact.
    #[error("protocol error: {0}")]
    Decode(String),
    /// The backend reported an error inside a well-formed frame.
    #[error("{0}")]
    Upstream(String),
    /// The connection closed before a terminal frame was seen.
    #[error("stream ended unexpectedly: {0}")]
    IncompleteStream(String),
}

impl From<DecodeError> for JobError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Malformed(detail) => Self::Decode(detail),
            DecodeError::Truncated(detail) => Self::IncompleteStream(detail),
        }
    }
}
