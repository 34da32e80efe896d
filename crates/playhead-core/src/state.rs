//! Playback state machine
//!
//! Derives the externally visible state from sink signals and session
//! inputs. All snapshot mutation funnels through [`PlaybackState::apply`],
//! so invalid combinations (an error alongside an active buffering flag,
//! playing while idle) cannot be produced from scattered handlers.

use crate::error::PlaybackError;
use crate::events::PlayerEvent;
use crate::sink::SinkEvent;
use crate::types::{PlaybackSnapshot, Rendition};

/// Lifecycle phase of the current source
///
/// `Failed` is terminal until a new source is assigned; while failed, only
/// sink-level mirrors (volume, rate) are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// No source bound
    Idle,
    /// Source assigned, first frames not yet ready
    Loading,
    Playing,
    Paused,
    /// Stalled waiting for data; remembers what to resume into
    Buffering { was_playing: bool },
    Ended,
    Failed,
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Idle => write!(f, "idle"),
            PlaybackPhase::Loading => write!(f, "loading"),
            PlaybackPhase::Playing => write!(f, "playing"),
            PlaybackPhase::Paused => write!(f, "paused"),
            PlaybackPhase::Buffering { .. } => write!(f, "buffering"),
            PlaybackPhase::Ended => write!(f, "ended"),
            PlaybackPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Inputs accepted by the state machine
#[derive(Debug, Clone)]
pub enum StateInput {
    /// A new source was assigned; reset transients and start loading
    SourceChanged,
    /// The source was cleared; reset transients and go idle
    SourceCleared,
    /// A surfaced playback failure (recovery exhausted, sink error)
    PlaybackFailed(PlaybackError),
    /// Manifest parsed; replace the rendition list wholesale
    RenditionsReplaced(Vec<Rendition>),
    /// Engine switched levels, or a manual selection was issued
    ActiveRenditionChanged(i32),
    /// Playback rate command issued against the sink
    RateChanged(f64),
    /// A sink lifecycle event
    Sink(SinkEvent),
}

/// The session's single source of truth for visible playback state
#[derive(Debug, Clone)]
pub struct PlaybackState {
    phase: PlaybackPhase,
    snapshot: PlaybackSnapshot,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            snapshot: PlaybackSnapshot::default(),
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn snapshot(&self) -> &PlaybackSnapshot {
        &self.snapshot
    }

    /// Apply one input and return the notifications it produced
    pub fn apply(&mut self, input: StateInput) -> Vec<PlayerEvent> {
        match input {
            StateInput::SourceChanged => {
                self.reset_transients();
                self.phase = PlaybackPhase::Loading;
                Vec::new()
            }
            StateInput::SourceCleared => {
                self.reset_transients();
                self.phase = PlaybackPhase::Idle;
                Vec::new()
            }
            StateInput::PlaybackFailed(error) => self.fail(error),
            StateInput::RenditionsReplaced(renditions) => {
                if self.phase == PlaybackPhase::Failed {
                    return Vec::new();
                }
                self.snapshot.renditions = renditions;
                self.snapshot.active_rendition = -1;
                Vec::new()
            }
            StateInput::ActiveRenditionChanged(level) => {
                if self.phase == PlaybackPhase::Failed {
                    return Vec::new();
                }
                self.snapshot.active_rendition = level;
                Vec::new()
            }
            StateInput::RateChanged(rate) => {
                self.snapshot.playback_rate = rate;
                Vec::new()
            }
            StateInput::Sink(event) => self.apply_sink(event),
        }
    }

    fn fail(&mut self, error: PlaybackError) -> Vec<PlayerEvent> {
        // Terminal until a new source; repeats of the same failure are
        // reported exactly once
        if self.phase == PlaybackPhase::Failed {
            return Vec::new();
        }

        let mut events = Vec::new();
        if self.snapshot.is_buffering {
            self.snapshot.is_buffering = false;
            events.push(PlayerEvent::Buffering { active: false });
        }
        self.snapshot.is_playing = false;
        self.snapshot.error = Some(error.clone());
        self.phase = PlaybackPhase::Failed;
        events.push(PlayerEvent::Error { error });
        events
    }

    fn apply_sink(&mut self, event: SinkEvent) -> Vec<PlayerEvent> {
        // With no source bound, or after a terminal failure, only
        // sink-level settings keep mirroring
        if matches!(self.phase, PlaybackPhase::Idle | PlaybackPhase::Failed)
            && !matches!(event, SinkEvent::VolumeChange { .. })
        {
            return Vec::new();
        }

        let mut events = Vec::new();
        match event {
            SinkEvent::Play => {
                if !self.snapshot.is_playing {
                    self.snapshot.is_playing = true;
                    events.push(PlayerEvent::Play);
                }
                self.phase = match self.phase {
                    PlaybackPhase::Buffering { .. } => {
                        PlaybackPhase::Buffering { was_playing: true }
                    }
                    PlaybackPhase::Loading => PlaybackPhase::Loading,
                    _ => PlaybackPhase::Playing,
                };
            }
            SinkEvent::Pause => {
                if self.snapshot.is_playing {
                    self.snapshot.is_playing = false;
                    events.push(PlayerEvent::Pause);
                }
                self.phase = match self.phase {
                    PlaybackPhase::Buffering { .. } => {
                        PlaybackPhase::Buffering { was_playing: false }
                    }
                    PlaybackPhase::Playing => PlaybackPhase::Paused,
                    other => other,
                };
            }
            SinkEvent::Ended => {
                self.snapshot.is_playing = false;
                if self.snapshot.is_buffering {
                    self.snapshot.is_buffering = false;
                    events.push(PlayerEvent::Buffering { active: false });
                }
                self.phase = PlaybackPhase::Ended;
                events.push(PlayerEvent::Ended);
            }
            SinkEvent::TimeUpdate { position } => {
                self.snapshot.current_time = position;
                events.push(PlayerEvent::TimeUpdate { position });
            }
            SinkEvent::DurationChange { duration } => {
                if duration.is_finite() {
                    self.snapshot.is_live = false;
                    self.snapshot.duration = duration;
                    events.push(PlayerEvent::DurationChange { duration });
                } else {
                    // Non-finite duration is the live signal
                    self.snapshot.is_live = true;
                    self.snapshot.duration = 0.0;
                }
            }
            SinkEvent::VolumeChange { volume, muted } => {
                self.snapshot.volume = volume;
                self.snapshot.is_muted = muted;
            }
            SinkEvent::Waiting => {
                if !self.snapshot.is_buffering {
                    self.snapshot.is_buffering = true;
                    events.push(PlayerEvent::Buffering { active: true });
                }
                self.phase = match self.phase {
                    PlaybackPhase::Playing => PlaybackPhase::Buffering { was_playing: true },
                    PlaybackPhase::Paused => PlaybackPhase::Buffering { was_playing: false },
                    other => other,
                };
            }
            // Platforms differ on which of these fires when a stall
            // resolves, so both clear the flag
            SinkEvent::CanPlay | SinkEvent::Playing => {
                if self.snapshot.is_buffering {
                    self.snapshot.is_buffering = false;
                    events.push(PlayerEvent::Buffering { active: false });
                }
                self.phase = match self.phase {
                    PlaybackPhase::Buffering { was_playing: true } => PlaybackPhase::Playing,
                    PlaybackPhase::Buffering { was_playing: false } => PlaybackPhase::Paused,
                    PlaybackPhase::Loading => {
                        if self.snapshot.is_playing {
                            PlaybackPhase::Playing
                        } else {
                            PlaybackPhase::Paused
                        }
                    }
                    other => other,
                };
            }
            SinkEvent::Progress { buffered } => {
                self.snapshot.buffered = buffered;
            }
            SinkEvent::Seeked { .. } => {
                // Observed by the session for logging; position mirrors
                // arrive via timeupdate
            }
            SinkEvent::Error { .. } => {
                // Mapped by the session before reaching the machine
            }
        }
        events
    }

    fn reset_transients(&mut self) {
        // Volume, mute, and rate are sink-level settings that persist
        // across sources
        self.snapshot.is_playing = false;
        self.snapshot.current_time = 0.0;
        self.snapshot.duration = 0.0;
        self.snapshot.error = None;
        self.snapshot.is_buffering = false;
        self.snapshot.is_live = false;
        self.snapshot.renditions.clear();
        self.snapshot.active_rendition = -1;
        self.snapshot.buffered.clear();
    }
}
