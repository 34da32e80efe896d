//! # Playhead Core
//!
//! Engine-agnostic playback session management for adaptive and
//! progressive media sources.
//!
//! A [`PlayerSession`] sits between an application and a platform media
//! sink. It classifies each source, decides how it should be played, and
//! owns the adaptive engine lifecycle when one is needed:
//!
//! ```text
//!   commands ────▶ ┌───────────────┐ ────▶ PlayerEvent (broadcast)
//!                  │ PlayerSession │ ────▶ PlaybackSnapshot (watch)
//!   SinkEvent ───▶ └───┬───────┬───┘
//!                      │       │
//!              MediaSink       AdaptiveEngine (per manifest source)
//! ```
//!
//! ## Features
//!
//! - Source classification: manifest URLs vs progressive files
//! - Playback path selection: native, engine-backed, or direct
//! - Bounded retry with linear backoff for fatal network errors
//! - Rendition tracking with manual quality override
//! - Live stream detection and live edge seeking
//! - Simulated sink and engine for deterministic tests
//!
//! ## Quick Start
//!
//! ```
//! use playhead_core::{PlayerSession, SessionConfig};
//! use playhead_core::sim::SimMediaSink;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> playhead_core::Result<()> {
//! let sink = Arc::new(SimMediaSink::new());
//! let session = PlayerSession::new(SessionConfig::default(), sink, None)?;
//!
//! session.set_source(Some("https://example.com/clip.mp4")).await?;
//! session.play().await;
//!
//! let snapshot = session.snapshot().await;
//! assert!(!snapshot.is_live);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod recovery;
pub mod renditions;
pub mod resolver;
pub mod session;
pub mod sim;
pub mod sink;
pub mod state;
pub mod types;

pub use config::{EngineTuning, EngineTuningOverrides, SessionConfig};
pub use engine::{
    AdaptiveEngine, EngineError, EngineErrorCategory, EngineEvent, EngineFactory, EngineLevel,
};
pub use error::{Error, ErrorKind, PlaybackError, Result};
pub use events::PlayerEvent;
pub use recovery::{RecoveryAction, RETRY_BASE_DELAY_MS, RETRY_LIMIT};
pub use renditions::AUTO_LEVEL;
pub use resolver::SourceKind;
pub use session::PlayerSession;
pub use sink::{MediaErrorCode, MediaSink, PlayRejected, SharedSink, SinkEvent};
pub use state::{PlaybackPhase, PlaybackState, StateInput};
pub use types::{PlaybackPath, PlaybackSnapshot, Rendition, SessionId, TimeRange};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library startup; call once from the host application
pub fn init() {
    tracing::info!(version = VERSION, "Playhead core initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
