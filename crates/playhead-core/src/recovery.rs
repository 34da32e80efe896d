//! Error recovery policy
//!
//! Classifies engine-reported errors into recovery actions. Applies only to
//! the engine-adaptive path; direct and native sink errors go straight to
//! the playback state machine. The policy is a pure function so the whole
//! table is unit-testable; the session executes the returned action.

use crate::engine::{EngineError, EngineErrorCategory};
use crate::error::{ErrorKind, PlaybackError};
use std::time::Duration;

/// Consecutive fatal network failures tolerated before giving up
pub const RETRY_LIMIT: u32 = 3;

/// Backoff unit; the delay grows linearly with the attempt number
/// (1s, then 2s), not exponentially
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

const RETRIES_EXHAUSTED_MESSAGE: &str = "Failed to load stream after multiple retries.";
const FATAL_STREAM_MESSAGE: &str = "An unrecoverable streaming error occurred.";

/// What the session should do about an engine error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Non-fatal; observe and let the engine self-heal
    Ignore,
    /// Re-request loading on the same engine instance after the delay
    Retry { attempt: u32, delay: Duration },
    /// Invoke the engine's built-in decode-error recovery
    RecoverMedia,
    /// Terminal for the session until a new source is assigned
    Fail { error: PlaybackError },
}

/// Classify an engine error given how many retries were already used
pub fn classify(error: &EngineError, retries_used: u32) -> RecoveryAction {
    if !error.fatal {
        return RecoveryAction::Ignore;
    }

    match error.category {
        EngineErrorCategory::Network => {
            let attempt = retries_used + 1;
            if attempt < RETRY_LIMIT {
                RecoveryAction::Retry {
                    attempt,
                    delay: Duration::from_millis(RETRY_BASE_DELAY_MS * u64::from(attempt)),
                }
            } else {
                RecoveryAction::Fail {
                    error: PlaybackError::new(
                        ErrorKind::StreamNetworkError,
                        RETRIES_EXHAUSTED_MESSAGE,
                    ),
                }
            }
        }
        EngineErrorCategory::Media => RecoveryAction::RecoverMedia,
        EngineErrorCategory::Other => RecoveryAction::Fail {
            error: PlaybackError::new(ErrorKind::StreamFatalError, FATAL_STREAM_MESSAGE),
        },
    }
}
