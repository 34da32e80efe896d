//! Adaptive streaming engine contract
//!
//! A manifest-driven engine that attaches to a media sink and streams one
//! rendition at a time. Only instantiated when the sink lacks native support
//! for the manifest format. The engine reports back exclusively through the
//! event channel handed to its factory; `load` and the recovery calls are
//! fire-and-forget.

use crate::config::EngineTuning;
use crate::error::Result;
use crate::sink::SharedSink;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One quality level reported by the engine's manifest parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLevel {
    pub width: u32,
    pub height: u32,
    /// Bandwidth in bits per second
    pub bitrate: u64,
}

/// Engine error category driving the recovery policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorCategory {
    Network,
    Media,
    Other,
}

impl std::fmt::Display for EngineErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineErrorCategory::Network => write!(f, "network"),
            EngineErrorCategory::Media => write!(f, "media"),
            EngineErrorCategory::Other => write!(f, "other"),
        }
    }
}

/// An error reported by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineError {
    /// Fatal errors halt this engine instance unless recovery succeeds;
    /// non-fatal errors are expected to self-heal
    pub fatal: bool,
    pub category: EngineErrorCategory,
    pub message: String,
}

/// Lifecycle events emitted by an engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Manifest downloaded and parsed; carries the full level list
    ManifestParsed { levels: Vec<EngineLevel> },
    /// The engine switched renditions (adaptive decision or confirmed
    /// manual lock)
    LevelSwitched { level: i32 },
    Error(EngineError),
}

/// A live adaptive engine instance
///
/// Owned exclusively by the session's engine slot. `destroy` must cancel all
/// in-flight work and is idempotent; a destroyed instance is never reused.
pub trait AdaptiveEngine: Send + Sync {
    /// Bind the engine to a sink. Must be called before `load`; the reverse
    /// order is undefined by this contract.
    fn attach(&mut self, sink: SharedSink) -> Result<()>;

    /// Start loading a manifest. Failures are reported via [`EngineEvent`].
    fn load(&mut self, url: &str);

    /// Lock streaming to a level index, or -1 for automatic selection
    fn set_level(&mut self, level: i32);

    /// Invoke the engine's built-in decode-error recovery path
    fn recover_media_error(&mut self);

    /// Live synchronization position in seconds, when the stream is live
    /// and the engine knows it
    fn live_sync_position(&self) -> Option<f64>;

    /// Detach from the sink and cancel in-flight activity
    fn destroy(&mut self);
}

/// Builds engine instances on demand
///
/// The session hands each instance a dedicated event sender; events from a
/// destroyed instance are discarded by generation checks upstream.
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        tuning: &EngineTuning,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Box<dyn AdaptiveEngine>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_serde_tag() {
        let json = serde_json::to_string(&EngineEvent::LevelSwitched { level: 2 }).unwrap();
        assert_eq!(json, r#"{"event":"level_switched","level":2}"#);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(EngineErrorCategory::Network.to_string(), "network");
        assert_eq!(EngineErrorCategory::Other.to_string(), "other");
    }
}
