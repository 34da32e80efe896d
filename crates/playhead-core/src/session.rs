//! Player session - main orchestrator for playback
//!
//! Coordinates:
//! - Source classification and playback path selection
//! - Engine lifecycle across source changes
//! - Error recovery and retry scheduling
//! - Rendition tracking and manual override
//! - State machine transitions and outbound notifications

use crate::{
    config::{EngineTuning, SessionConfig},
    engine::{EngineError, EngineEvent, EngineFactory},
    error::{ErrorKind, PlaybackError, Result},
    events::PlayerEvent,
    recovery::{self, RecoveryAction, RETRY_LIMIT},
    renditions,
    resolver,
    sink::{SharedSink, SinkEvent},
    state::{PlaybackPhase, PlaybackState, StateInput},
    types::{PlaybackPath, PlaybackSnapshot, SessionId},
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tracing::{debug, error, info, instrument, warn};

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// One live engine bound to the session's sink
///
/// The generation tags every piece of deferred work issued against this
/// instance; stale work re-validates it before touching the engine.
struct EngineSlot {
    generation: u64,
    handle: Box<dyn crate::engine::AdaptiveEngine>,
}

struct Inner {
    path: PlaybackPath,
    source: Option<String>,
    machine: PlaybackState,
    engine: Option<EngineSlot>,
    next_generation: u64,
    retry_count: u32,
    autoplay_pending: bool,
}

struct Shared {
    id: SessionId,
    config: SessionConfig,
    tuning: EngineTuning,
    sink: SharedSink,
    engine_factory: Option<Arc<dyn EngineFactory>>,
    inner: RwLock<Inner>,
    events_tx: broadcast::Sender<PlayerEvent>,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
}

/// Player session managing a single sink
///
/// Owns the only engine slot bound to the sink; no other component may
/// construct or destroy engines. All visible state flows through the
/// playback state machine and out via [`PlayerSession::subscribe`] and
/// [`PlayerSession::watch_snapshot`].
pub struct PlayerSession {
    shared: Arc<Shared>,
}

impl PlayerSession {
    /// Create a session bound to a sink, with an optional engine factory
    /// for manifests the sink cannot play natively
    pub fn new(
        config: SessionConfig,
        sink: SharedSink,
        engine_factory: Option<Arc<dyn EngineFactory>>,
    ) -> Result<Self> {
        let tuning = config.resolve_tuning()?;
        let machine = PlaybackState::new();
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (snapshot_tx, _) = watch::channel(machine.snapshot().clone());

        let shared = Arc::new(Shared {
            id: SessionId::new(),
            config,
            tuning,
            sink,
            engine_factory,
            inner: RwLock::new(Inner {
                path: PlaybackPath::Uninitialized,
                source: None,
                machine,
                engine: None,
                next_generation: 1,
                retry_count: 0,
                autoplay_pending: false,
            }),
            events_tx,
            snapshot_tx,
        });

        Shared::spawn_sink_pump(&shared);
        info!(session_id = %shared.id, "Player session created");
        Ok(Self { shared })
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    /// Assign, replace, or clear the source
    ///
    /// Tears down any prior engine, resets transient state, classifies the
    /// source, and wires the chosen playback path. An empty string counts
    /// as absent.
    #[instrument(skip(self))]
    pub async fn set_source(&self, source: Option<&str>) -> Result<()> {
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        self.shared.apply_source(source).await
    }

    /// Request playback; platform rejections are logged and swallowed
    #[instrument(skip(self))]
    pub async fn play(&self) {
        let path = self.shared.inner.read().await.path;
        if path == PlaybackPath::Uninitialized {
            warn!(session_id = %self.shared.id, "Cannot play without a source");
            return;
        }
        self.shared.request_play().await;
    }

    #[instrument(skip(self))]
    pub async fn pause(&self) {
        self.shared.sink.pause();
    }

    /// Seek to a position, clamped to the known duration
    #[instrument(skip(self))]
    pub async fn seek(&self, seconds: f64) {
        let duration = {
            let inner = self.shared.inner.read().await;
            inner.machine.snapshot().duration
        };
        let clamped = if duration > 0.0 {
            seconds.clamp(0.0, duration)
        } else {
            seconds.max(0.0)
        };
        debug!(session_id = %self.shared.id, to = clamped, "Seeking");
        self.shared.sink.set_current_time(clamped);
    }

    /// Set volume, clamped to [0, 1]
    pub async fn set_volume(&self, volume: f64) {
        self.shared.sink.set_volume(volume.clamp(0.0, 1.0));
    }

    pub async fn toggle_mute(&self) {
        let muted = {
            let inner = self.shared.inner.read().await;
            inner.machine.snapshot().is_muted
        };
        self.shared.sink.set_muted(!muted);
    }

    pub async fn set_playback_rate(&self, rate: f64) {
        self.shared.sink.set_playback_rate(rate);
        let mut inner = self.shared.inner.write().await;
        let events = inner.machine.apply(StateInput::RateChanged(rate));
        self.shared.publish(&inner.machine, events);
    }

    /// Lock the stream to a rendition, or hand control back to automatic
    /// selection with -1
    ///
    /// The snapshot reflects the request immediately; if the engine later
    /// reports a different active level, that event wins.
    #[instrument(skip(self))]
    pub async fn set_quality_level(&self, level: i32) -> Result<()> {
        let mut inner = self.shared.inner.write().await;
        renditions::validate_selection(level, inner.machine.snapshot().renditions.len())?;

        let events = inner.machine.apply(StateInput::ActiveRenditionChanged(level));
        self.shared.publish(&inner.machine, events);
        if let Some(slot) = inner.engine.as_mut() {
            slot.handle.set_level(level);
        }
        info!(session_id = %self.shared.id, level, "Quality level requested");
        Ok(())
    }

    /// Jump to the live edge; valid only while the stream is live
    #[instrument(skip(self))]
    pub async fn seek_to_live_edge(&self) {
        let inner = self.shared.inner.read().await;
        if !inner.machine.snapshot().is_live {
            warn!(session_id = %self.shared.id, "Live edge seek ignored, stream is not live");
            return;
        }
        match inner.engine.as_ref() {
            Some(slot) => match slot.handle.live_sync_position() {
                Some(position) if position.is_finite() => {
                    debug!(session_id = %self.shared.id, position, "Seeking to live edge");
                    self.shared.sink.set_current_time(position);
                }
                _ => warn!(session_id = %self.shared.id, "Engine reported no live position"),
            },
            None => {
                debug!(
                    session_id = %self.shared.id,
                    "Live edge on the native path relies on platform seek semantics"
                );
            }
        }
    }

    /// Get the current playback snapshot
    pub async fn snapshot(&self) -> PlaybackSnapshot {
        self.shared.inner.read().await.machine.snapshot().clone()
    }

    /// Get the current lifecycle phase
    pub async fn phase(&self) -> PlaybackPhase {
        self.shared.inner.read().await.machine.phase()
    }

    /// Get the playback path chosen for the current source
    pub async fn path(&self) -> PlaybackPath {
        self.shared.inner.read().await.path
    }

    /// Network retries consumed by the current source
    pub async fn retry_count(&self) -> u32 {
        self.shared.inner.read().await.retry_count
    }

    /// Subscribe to outbound notifications
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Subscribe to snapshot changes
    pub fn watch_snapshot(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Tear down the session: destroy the engine and release the sink
    #[instrument(skip(self))]
    pub async fn close(&self) {
        // Clearing the source runs the full teardown path
        let _ = self.shared.apply_source(None).await;
        info!(session_id = %self.shared.id, "Player session closed");
    }
}

impl Shared {
    async fn apply_source(self: &Arc<Self>, source: Option<String>) -> Result<()> {
        let mut inner = self.inner.write().await;

        // Prior engine goes first; never two live engines on one sink
        if let Some(mut slot) = inner.engine.take() {
            debug!(session_id = %self.id, generation = slot.generation, "Destroying engine");
            slot.handle.destroy();
        }
        inner.retry_count = 0;
        inner.autoplay_pending = false;

        let reset = match source {
            Some(_) => StateInput::SourceChanged,
            None => StateInput::SourceCleared,
        };
        let events = inner.machine.apply(reset);
        self.publish(&inner.machine, events);

        inner.source = source.clone();
        let Some(url) = source else {
            self.sink.set_source(None);
            inner.path = PlaybackPath::Uninitialized;
            info!(session_id = %self.id, "Source cleared");
            return Ok(());
        };

        let kind = resolver::classify(&url);
        if !kind.is_manifest() || !self.config.adaptive_enabled {
            self.sink.set_source(Some(&url));
            self.sink.request_load();
            inner.path = PlaybackPath::Direct;
            inner.autoplay_pending = self.config.autoplay;
            info!(session_id = %self.id, url = %url, path = %inner.path, "Source resolved");
            return Ok(());
        }

        if self.sink.supports_native_adaptive() {
            self.sink.set_source(Some(&url));
            self.sink.request_load();
            inner.path = PlaybackPath::NativeAdaptive;
            inner.autoplay_pending = self.config.autoplay;
            info!(session_id = %self.id, url = %url, path = %inner.path, "Source resolved");
            return Ok(());
        }

        let Some(factory) = self.engine_factory.as_ref() else {
            self.sink.set_source(None);
            inner.path = PlaybackPath::Uninitialized;
            warn!(
                session_id = %self.id,
                url = %url,
                "Manifest source with no native support and no engine available"
            );
            let events = inner
                .machine
                .apply(StateInput::PlaybackFailed(PlaybackError::new(
                    ErrorKind::SrcNotSupported,
                    "No adaptive playback support available for this stream.",
                )));
            self.publish(&inner.machine, events);
            return Ok(());
        };

        let generation = inner.next_generation;
        inner.next_generation += 1;

        let (engine_tx, engine_rx) = mpsc::unbounded_channel();
        let mut handle = factory.create(&self.tuning, engine_tx);

        // The engine owns the sink's source while attached
        self.sink.set_source(None);
        if let Err(err) = handle.attach(Arc::clone(&self.sink)) {
            handle.destroy();
            inner.path = PlaybackPath::Uninitialized;
            error!(session_id = %self.id, error = %err, "Engine attach failed");
            return Err(err);
        }
        // Attachment precedes loading; the reverse order is undefined
        handle.load(&url);

        inner.engine = Some(EngineSlot { generation, handle });
        inner.path = PlaybackPath::EngineAdaptive;
        inner.autoplay_pending = self.config.autoplay;
        Self::spawn_engine_pump(self, generation, engine_rx);
        info!(
            session_id = %self.id,
            url = %url,
            generation,
            path = %inner.path,
            "Engine attached and loading"
        );
        Ok(())
    }

    async fn handle_sink_event(self: &Arc<Self>, event: SinkEvent) {
        let mut request_play = false;
        {
            let mut inner = self.inner.write().await;
            let input = match event {
                SinkEvent::Error { code, message } => {
                    if inner.path == PlaybackPath::EngineAdaptive {
                        // The engine owns error reporting on this path
                        debug!(
                            session_id = %self.id,
                            code = ?code,
                            message = %message,
                            "Sink error deferred to engine policy"
                        );
                        None
                    } else {
                        warn!(session_id = %self.id, code = ?code, message = %message, "Sink error");
                        Some(StateInput::PlaybackFailed(PlaybackError::new(
                            code.into(),
                            message,
                        )))
                    }
                }
                SinkEvent::Seeked { position } => {
                    debug!(session_id = %self.id, position, "Seek settled");
                    None
                }
                SinkEvent::CanPlay => {
                    if inner.autoplay_pending && inner.path != PlaybackPath::EngineAdaptive {
                        inner.autoplay_pending = false;
                        request_play = true;
                    }
                    Some(StateInput::Sink(SinkEvent::CanPlay))
                }
                other => Some(StateInput::Sink(other)),
            };
            if let Some(input) = input {
                let events = inner.machine.apply(input);
                self.publish(&inner.machine, events);
            }
        }
        if request_play {
            self.request_play().await;
        }
    }

    async fn handle_engine_event(self: &Arc<Self>, generation: u64, event: EngineEvent) {
        let mut request_play = false;
        {
            let mut inner = self.inner.write().await;
            let current = inner.engine.as_ref().map(|slot| slot.generation);
            if current != Some(generation) {
                debug!(session_id = %self.id, generation, "Dropping event from replaced engine");
                return;
            }
            if inner.machine.phase() == PlaybackPhase::Failed {
                debug!(session_id = %self.id, "Ignoring engine event after terminal failure");
                return;
            }

            match event {
                EngineEvent::ManifestParsed { levels } => {
                    let renditions = renditions::map_levels(&levels);
                    info!(
                        session_id = %self.id,
                        renditions = renditions.len(),
                        "Manifest parsed"
                    );
                    let events = inner
                        .machine
                        .apply(StateInput::RenditionsReplaced(renditions));
                    self.publish(&inner.machine, events);
                    if inner.autoplay_pending {
                        inner.autoplay_pending = false;
                        request_play = true;
                    }
                }
                EngineEvent::LevelSwitched { level } => {
                    debug!(session_id = %self.id, level, "Rendition switched");
                    let events = inner
                        .machine
                        .apply(StateInput::ActiveRenditionChanged(level));
                    self.publish(&inner.machine, events);
                }
                EngineEvent::Error(engine_error) => {
                    self.handle_engine_error(&mut inner, generation, engine_error);
                }
            }
        }
        if request_play {
            self.request_play().await;
        }
    }

    fn handle_engine_error(
        self: &Arc<Self>,
        inner: &mut Inner,
        generation: u64,
        engine_error: EngineError,
    ) {
        match recovery::classify(&engine_error, inner.retry_count) {
            RecoveryAction::Ignore => {
                debug!(
                    session_id = %self.id,
                    category = %engine_error.category,
                    message = %engine_error.message,
                    "Non-fatal engine error"
                );
            }
            RecoveryAction::Retry { attempt, delay } => {
                inner.retry_count = attempt;
                warn!(
                    session_id = %self.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    message = %engine_error.message,
                    "Fatal network error, retry scheduled"
                );
                let weak = Arc::downgrade(self);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(shared) = weak.upgrade() {
                        shared.retry_load(generation, attempt).await;
                    }
                });
            }
            RecoveryAction::RecoverMedia => {
                warn!(
                    session_id = %self.id,
                    message = %engine_error.message,
                    "Fatal media error, invoking engine recovery"
                );
                if let Some(slot) = inner.engine.as_mut() {
                    slot.handle.recover_media_error();
                }
            }
            RecoveryAction::Fail { error } => {
                if error.kind == ErrorKind::StreamNetworkError {
                    inner.retry_count = RETRY_LIMIT;
                } else if let Some(mut slot) = inner.engine.take() {
                    // Unrecoverable engine failure; tear it down now
                    slot.handle.destroy();
                }
                error!(
                    session_id = %self.id,
                    kind = %error.kind,
                    message = %error.message,
                    "Playback failed"
                );
                let events = inner.machine.apply(StateInput::PlaybackFailed(error));
                self.publish(&inner.machine, events);
            }
        }
    }

    /// Deferred retry body; validates the engine generation at fire time
    async fn retry_load(&self, generation: u64, attempt: u32) {
        let mut inner = self.inner.write().await;
        let current = inner.engine.as_ref().map(|slot| slot.generation);
        if current != Some(generation) {
            debug!(session_id = %self.id, generation, "Dropping retry for replaced engine");
            return;
        }
        if inner.machine.phase() == PlaybackPhase::Failed {
            return;
        }
        let Some(url) = inner.source.clone() else {
            return;
        };
        info!(session_id = %self.id, attempt, url = %url, "Retrying stream load");
        if let Some(slot) = inner.engine.as_mut() {
            slot.handle.load(&url);
        }
    }

    async fn request_play(&self) {
        if let Err(rejected) = self.sink.play().await {
            warn!(
                session_id = %self.id,
                reason = %rejected.reason,
                "Play request rejected"
            );
        }
    }

    fn publish(&self, machine: &PlaybackState, events: Vec<PlayerEvent>) {
        let _ = self.snapshot_tx.send(machine.snapshot().clone());
        for event in events {
            let _ = self.events_tx.send(event);
        }
    }

    fn spawn_sink_pump(shared: &Arc<Shared>) {
        let mut events = shared.sink.subscribe();
        let weak = Arc::downgrade(shared);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(shared) = weak.upgrade() else { break };
                        shared.handle_sink_event(event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Sink event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn spawn_engine_pump(
        shared: &Arc<Shared>,
        generation: u64,
        mut events: mpsc::UnboundedReceiver<EngineEvent>,
    ) {
        let weak = Arc::downgrade(shared);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(shared) = weak.upgrade() else { break };
                shared.handle_engine_event(generation, event).await;
            }
        });
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        // Best effort; pumps only hold weak references, so by the time the
        // session drops nobody else is inside the lock
        if let Ok(mut inner) = self.inner.try_write() {
            if let Some(mut slot) = inner.engine.take() {
                slot.handle.destroy();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{settle, SimMediaSink, SinkOp};

    #[tokio::test]
    async fn test_session_creation() {
        let sink = Arc::new(SimMediaSink::new());
        let session = PlayerSession::new(SessionConfig::default(), sink, None).unwrap();

        assert_eq!(session.path().await, PlaybackPath::Uninitialized);
        assert_eq!(session.phase().await, PlaybackPhase::Idle);
        assert_eq!(session.retry_count().await, 0);
    }

    #[tokio::test]
    async fn test_direct_source_drives_the_sink() {
        let sink = Arc::new(SimMediaSink::new());
        let session =
            PlayerSession::new(SessionConfig::default(), sink.clone(), None).unwrap();

        session
            .set_source(Some("https://example.com/a.mp4"))
            .await
            .unwrap();

        assert_eq!(session.path().await, PlaybackPath::Direct);
        assert_eq!(session.phase().await, PlaybackPhase::Loading);
        let ops = sink.ops();
        assert!(ops.contains(&SinkOp::SetSource(Some(
            "https://example.com/a.mp4".to_string()
        ))));
        assert!(ops.contains(&SinkOp::RequestLoad));
    }

    #[tokio::test]
    async fn test_empty_source_counts_as_absent() {
        let sink = Arc::new(SimMediaSink::new());
        let session =
            PlayerSession::new(SessionConfig::default(), sink.clone(), None).unwrap();

        session.set_source(Some("   ")).await.unwrap();
        assert_eq!(session.path().await, PlaybackPath::Uninitialized);
        assert!(sink.ops().contains(&SinkOp::SetSource(None)));
    }

    #[tokio::test]
    async fn test_volume_commands_clamp_and_mirror() {
        let sink = Arc::new(SimMediaSink::new());
        let session =
            PlayerSession::new(SessionConfig::default(), sink.clone(), None).unwrap();

        session.set_volume(1.7).await;
        settle().await;
        assert_eq!(session.snapshot().await.volume, 1.0);

        session.set_volume(0.3).await;
        session.toggle_mute().await;
        settle().await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.volume, 0.3);
        assert!(snapshot.is_muted);
    }

    #[tokio::test]
    async fn test_play_without_source_is_refused() {
        let sink = Arc::new(SimMediaSink::new());
        let session =
            PlayerSession::new(SessionConfig::default(), sink.clone(), None).unwrap();

        session.play().await;
        settle().await;
        assert!(!sink.ops().contains(&SinkOp::Play));
    }

    #[tokio::test]
    async fn test_seek_clamps_to_duration() {
        let sink = Arc::new(SimMediaSink::new());
        let session =
            PlayerSession::new(SessionConfig::default(), sink.clone(), None).unwrap();

        session
            .set_source(Some("https://example.com/a.mp4"))
            .await
            .unwrap();
        sink.emit(SinkEvent::DurationChange { duration: 100.0 });
        settle().await;

        session.seek(250.0).await;
        session.seek(-4.0).await;
        let ops = sink.ops();
        assert!(ops.contains(&SinkOp::SetCurrentTime(100.0)));
        assert!(ops.contains(&SinkOp::SetCurrentTime(0.0)));
    }

    #[tokio::test]
    async fn test_quality_selection_rejects_out_of_range() {
        let sink = Arc::new(SimMediaSink::new());
        let session = PlayerSession::new(SessionConfig::default(), sink, None).unwrap();

        let err = session.set_quality_level(2).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::RenditionOutOfRange {
                requested: 2,
                available: 0
            }
        ));
        // Automatic selection is always accepted
        session.set_quality_level(-1).await.unwrap();
    }
}
