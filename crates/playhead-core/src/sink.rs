//! Media sink contract
//!
//! The platform-provided playable element, seen through a trait. Playhead
//! never implements a real sink; it drives whatever the embedder supplies
//! and mirrors the sink's event stream into the playback state machine.

use crate::error::ErrorKind;
use crate::types::TimeRange;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// A playback request turned down by the platform (autoplay policy, user
/// gesture requirements). Not a playback fault; the session swallows it.
#[derive(Error, Debug, Clone)]
#[error("play request rejected: {reason}")]
pub struct PlayRejected {
    pub reason: String,
}

/// Native error classification reported by a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorCode {
    Aborted,
    Network,
    Decode,
    SrcNotSupported,
    Other,
}

impl From<MediaErrorCode> for ErrorKind {
    fn from(code: MediaErrorCode) -> Self {
        match code {
            MediaErrorCode::Aborted => ErrorKind::Aborted,
            MediaErrorCode::Network => ErrorKind::NetworkError,
            MediaErrorCode::Decode => ErrorKind::DecodeError,
            MediaErrorCode::SrcNotSupported => ErrorKind::SrcNotSupported,
            MediaErrorCode::Other => ErrorKind::Unknown,
        }
    }
}

/// Lifecycle events emitted by a media sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    Play,
    Pause,
    Ended,
    TimeUpdate { position: f64 },
    DurationChange { duration: f64 },
    VolumeChange { volume: f64, muted: bool },
    Waiting,
    CanPlay,
    Playing,
    Progress { buffered: Vec<TimeRange> },
    Seeked { position: f64 },
    Error { code: MediaErrorCode, message: String },
}

/// The platform's playable element
///
/// Control methods take `&self`; a sink is shared between the session and
/// its event pumps and owns its interior state. Everything except `play` is
/// fire-and-forget, with effects reported back through [`SinkEvent`]s.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Assign or clear the source property
    fn set_source(&self, source: Option<&str>);

    /// Ask the sink to (re)load the assigned source
    fn request_load(&self);

    /// Request playback; the platform may reject
    async fn play(&self) -> std::result::Result<(), PlayRejected>;

    fn pause(&self);

    fn set_current_time(&self, seconds: f64);

    fn set_volume(&self, volume: f64);

    fn set_muted(&self, muted: bool);

    fn set_playback_rate(&self, rate: f64);

    /// Whether the platform can play adaptive manifests without an engine
    fn supports_native_adaptive(&self) -> bool;

    /// Subscribe to the sink's lifecycle events
    fn subscribe(&self) -> broadcast::Receiver<SinkEvent>;
}

/// Object-safe alias used throughout the session
pub type SharedSink = Arc<dyn MediaSink>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_mapping() {
        assert_eq!(ErrorKind::from(MediaErrorCode::Aborted), ErrorKind::Aborted);
        assert_eq!(
            ErrorKind::from(MediaErrorCode::Network),
            ErrorKind::NetworkError
        );
        assert_eq!(
            ErrorKind::from(MediaErrorCode::Decode),
            ErrorKind::DecodeError
        );
        assert_eq!(
            ErrorKind::from(MediaErrorCode::SrcNotSupported),
            ErrorKind::SrcNotSupported
        );
        assert_eq!(ErrorKind::from(MediaErrorCode::Other), ErrorKind::Unknown);
    }

    #[test]
    fn test_sink_event_serde_tag() {
        let json = serde_json::to_string(&SinkEvent::TimeUpdate { position: 3.5 }).unwrap();
        assert_eq!(json, r#"{"event":"time_update","position":3.5}"#);

        let json = serde_json::to_string(&SinkEvent::Waiting).unwrap();
        assert_eq!(json, r#"{"event":"waiting"}"#);
    }
}
