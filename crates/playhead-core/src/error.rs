//! Error types for Playhead Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Session command and configuration errors
///
/// These are caller mistakes or collaborator refusals returned directly from
/// command methods. Playback-level failures live in [`PlaybackError`] and are
/// surfaced through the snapshot instead.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Command errors
    #[error("Rendition {requested} out of range: {available} renditions available")]
    RenditionOutOfRange { requested: i32, available: usize },

    // Engine errors
    #[error("Engine attach failed: {0}")]
    EngineAttach(String),
}

/// Classification of a surfaced playback failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Fetch aborted by the platform or the caller
    Aborted,
    /// Sink-reported network failure (direct/native paths)
    NetworkError,
    /// Sink-reported decode failure
    DecodeError,
    /// The sink cannot play the assigned source
    SrcNotSupported,
    /// Engine network retries exhausted
    StreamNetworkError,
    /// Unrecoverable engine failure
    StreamFatalError,
    /// Anything the sink did not classify
    Unknown,
}

impl ErrorKind {
    /// Stable string code for logs and serialized output
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Aborted => "ABORTED",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::DecodeError => "DECODE_ERROR",
            ErrorKind::SrcNotSupported => "SRC_NOT_SUPPORTED",
            ErrorKind::StreamNetworkError => "STREAM_NETWORK_ERROR",
            ErrorKind::StreamFatalError => "STREAM_FATAL_ERROR",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A playback failure visible in the snapshot
///
/// Once set, cleared only by a new source assignment.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct PlaybackError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PlaybackError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        assert_eq!(ErrorKind::StreamNetworkError.code(), "STREAM_NETWORK_ERROR");
        assert_eq!(ErrorKind::SrcNotSupported.code(), "SRC_NOT_SUPPORTED");
        assert_eq!(ErrorKind::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_playback_error_display() {
        let error = PlaybackError::new(ErrorKind::DecodeError, "bad frame");
        assert_eq!(error.to_string(), "DECODE_ERROR: bad frame");
    }

    #[test]
    fn test_error_kind_serde() {
        let json = serde_json::to_string(&ErrorKind::StreamFatalError).unwrap();
        assert_eq!(json, "\"STREAM_FATAL_ERROR\"");
    }
}
