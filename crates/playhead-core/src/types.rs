//! Core types for Playhead

use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which delivery integration the session chose for the current source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPath {
    /// No source bound, or the source cannot play
    Uninitialized,
    /// Manifest handed straight to a sink with native adaptive support
    NativeAdaptive,
    /// Manifest driven through a bundled adaptive engine
    EngineAdaptive,
    /// Progressive file assigned directly to the sink
    Direct,
}

impl std::fmt::Display for PlaybackPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPath::Uninitialized => write!(f, "uninitialized"),
            PlaybackPath::NativeAdaptive => write!(f, "native-adaptive"),
            PlaybackPath::EngineAdaptive => write!(f, "engine-adaptive"),
            PlaybackPath::Direct => write!(f, "direct"),
        }
    }
}

/// A buffered span of the timeline, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One selectable quality variant of the current stream
///
/// Immutable once constructed. `id` is the engine's stable level index;
/// callers may re-sort copies for display but `id` keeps its meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    /// Stable engine level index
    pub id: i32,
    pub width: u32,
    pub height: u32,
    /// Bandwidth in bits per second
    pub bitrate: u64,
    /// Human-readable name ("720p", "Level 3")
    pub display_name: String,
}

/// The externally visible playback state
///
/// Read freely by collaborators; mutated only through the playback state
/// machine. `active_rendition == -1` means automatic selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub current_time: f64,
    /// Seconds; 0 when live or unknown
    pub duration: f64,
    pub volume: f64,
    pub is_muted: bool,
    pub playback_rate: f64,
    pub is_buffering: bool,
    pub is_live: bool,
    pub error: Option<PlaybackError>,
    pub renditions: Vec<Rendition>,
    pub active_rendition: i32,
    pub buffered: Vec<TimeRange>,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            volume: 1.0,
            is_muted: false,
            playback_rate: 1.0,
            is_buffering: false,
            is_live: false,
            error: None,
            renditions: Vec::new(),
            active_rendition: -1,
            buffered: Vec::new(),
        }
    }
}
