//! Outbound session notifications

use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};

/// Notifications delivered to subscribers, at most once per underlying
/// event and never re-entrantly during command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    Play,
    Pause,
    Ended,
    TimeUpdate { position: f64 },
    /// Only fired for finite durations; live streams report through the
    /// snapshot's `is_live` flag instead
    DurationChange { duration: f64 },
    /// Fired when the buffering flag flips, not on every stall signal
    Buffering { active: bool },
    Error { error: PlaybackError },
}
