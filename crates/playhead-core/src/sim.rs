//! Simulated sink and engine for tests and offline experiments
//!
//! [`SimMediaSink`] records every command it receives and lets the caller
//! feed playback events back into the session. [`SimEngineFactory`] hands
//! out scripted engines and keeps a probe per instance so tests can assert
//! on engine interactions across source changes.

use crate::engine::{AdaptiveEngine, EngineEvent, EngineFactory};
use crate::error::{Error, Result};
use crate::sink::{MediaSink, PlayRejected, SharedSink, SinkEvent};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc};

const SIM_EVENT_CAPACITY: usize = 64;

/// Commands a session issued against the simulated sink, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOp {
    SetSource(Option<String>),
    RequestLoad,
    Play,
    Pause,
    SetCurrentTime(f64),
    SetVolume(f64),
    SetMuted(bool),
    SetPlaybackRate(f64),
}

/// Scriptable media sink
pub struct SimMediaSink {
    native_adaptive: bool,
    reject_play: AtomicBool,
    ops: Mutex<Vec<SinkOp>>,
    events_tx: broadcast::Sender<SinkEvent>,
}

impl SimMediaSink {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(SIM_EVENT_CAPACITY);
        Self {
            native_adaptive: false,
            reject_play: AtomicBool::new(false),
            ops: Mutex::new(Vec::new()),
            events_tx,
        }
    }

    /// Claim native manifest support, like Safari's video element does
    pub fn with_native_adaptive(mut self, supported: bool) -> Self {
        self.native_adaptive = supported;
        self
    }

    /// Make `play()` fail the way platform autoplay policies do
    pub fn with_play_rejection(mut self, reject: bool) -> Self {
        *self.reject_play.get_mut() = reject;
        self
    }

    /// Feed a playback event into whoever subscribed
    pub fn emit(&self, event: SinkEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Commands received so far
    pub fn ops(&self) -> Vec<SinkOp> {
        self.lock_ops().clone()
    }

    fn record(&self, op: SinkOp) {
        self.lock_ops().push(op);
    }

    fn lock_ops(&self) -> std::sync::MutexGuard<'_, Vec<SinkOp>> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn last_volume(&self) -> f64 {
        self.lock_ops()
            .iter()
            .rev()
            .find_map(|op| match op {
                SinkOp::SetVolume(volume) => Some(*volume),
                _ => None,
            })
            .unwrap_or(1.0)
    }

    fn last_muted(&self) -> bool {
        self.lock_ops()
            .iter()
            .rev()
            .find_map(|op| match op {
                SinkOp::SetMuted(muted) => Some(*muted),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl Default for SimMediaSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSink for SimMediaSink {
    fn set_source(&self, url: Option<&str>) {
        self.record(SinkOp::SetSource(url.map(str::to_owned)));
    }

    fn request_load(&self) {
        self.record(SinkOp::RequestLoad);
    }

    async fn play(&self) -> std::result::Result<(), PlayRejected> {
        if self.reject_play.load(Ordering::SeqCst) {
            return Err(PlayRejected {
                reason: "autoplay policy".to_string(),
            });
        }
        self.record(SinkOp::Play);
        self.emit(SinkEvent::Play);
        Ok(())
    }

    fn pause(&self) {
        self.record(SinkOp::Pause);
        self.emit(SinkEvent::Pause);
    }

    fn set_current_time(&self, seconds: f64) {
        self.record(SinkOp::SetCurrentTime(seconds));
        self.emit(SinkEvent::Seeked { position: seconds });
    }

    fn set_volume(&self, volume: f64) {
        self.record(SinkOp::SetVolume(volume));
        self.emit(SinkEvent::VolumeChange {
            volume,
            muted: self.last_muted(),
        });
    }

    fn set_muted(&self, muted: bool) {
        self.record(SinkOp::SetMuted(muted));
        self.emit(SinkEvent::VolumeChange {
            volume: self.last_volume(),
            muted,
        });
    }

    fn set_playback_rate(&self, rate: f64) {
        self.record(SinkOp::SetPlaybackRate(rate));
    }

    fn supports_native_adaptive(&self) -> bool {
        self.native_adaptive
    }

    fn subscribe(&self) -> broadcast::Receiver<SinkEvent> {
        self.events_tx.subscribe()
    }
}

/// Observation point for one simulated engine instance
///
/// The factory keeps a probe per created engine, so tests can still
/// inspect an engine after the session destroyed it.
pub struct SimEngineProbe {
    attach_count: AtomicU32,
    recover_calls: AtomicU32,
    destroyed: AtomicBool,
    load_calls: Mutex<Vec<String>>,
    set_level_calls: Mutex<Vec<i32>>,
    live_position: Mutex<Option<f64>>,
    events_tx: Mutex<Option<mpsc::UnboundedSender<EngineEvent>>>,
}

impl SimEngineProbe {
    fn new(events_tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self {
            attach_count: AtomicU32::new(0),
            recover_calls: AtomicU32::new(0),
            destroyed: AtomicBool::new(false),
            load_calls: Mutex::new(Vec::new()),
            set_level_calls: Mutex::new(Vec::new()),
            live_position: Mutex::new(None),
            events_tx: Mutex::new(Some(events_tx)),
        }
    }

    /// Emit an engine event toward the owning session
    pub fn emit(&self, event: EngineEvent) {
        let guard = self
            .events_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn set_live_position(&self, position: Option<f64>) {
        *self
            .live_position
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = position;
    }

    pub fn attach_count(&self) -> u32 {
        self.attach_count.load(Ordering::SeqCst)
    }

    pub fn recover_calls(&self) -> u32 {
        self.recover_calls.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn load_calls(&self) -> Vec<String> {
        self.load_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_level_calls(&self) -> Vec<i32> {
        self.set_level_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct SimEngine {
    probe: Arc<SimEngineProbe>,
}

impl AdaptiveEngine for SimEngine {
    fn attach(&mut self, _sink: SharedSink) -> Result<()> {
        if self.probe.destroyed.load(Ordering::SeqCst) {
            return Err(Error::EngineAttach("engine already destroyed".to_string()));
        }
        self.probe.attach_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&mut self, url: &str) {
        self.probe
            .load_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }

    fn set_level(&mut self, level: i32) {
        self.probe
            .set_level_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(level);
    }

    fn recover_media_error(&mut self) {
        self.probe.recover_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn live_sync_position(&self) -> Option<f64> {
        *self
            .probe
            .live_position
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn destroy(&mut self) {
        self.probe.destroyed.store(true, Ordering::SeqCst);
        // Dropping the sender closes the session's event pump
        self.probe
            .events_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Factory producing [`SimEngine`] instances, one probe each
pub struct SimEngineFactory {
    fail_attach: AtomicBool,
    probes: Mutex<Vec<Arc<SimEngineProbe>>>,
}

impl SimEngineFactory {
    pub fn new() -> Self {
        Self {
            fail_attach: AtomicBool::new(false),
            probes: Mutex::new(Vec::new()),
        }
    }

    /// Make the next engine refuse to attach
    pub fn with_attach_failure(self, fail: bool) -> Self {
        self.fail_attach.store(fail, Ordering::SeqCst);
        self
    }

    /// Probe for the n-th engine this factory created
    pub fn probe(&self, index: usize) -> Option<Arc<SimEngineProbe>> {
        self.probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    pub fn created(&self) -> usize {
        self.probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for SimEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFactory for SimEngineFactory {
    fn create(
        &self,
        _tuning: &crate::config::EngineTuning,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Box<dyn AdaptiveEngine> {
        let probe = Arc::new(SimEngineProbe::new(events));
        if self.fail_attach.load(Ordering::SeqCst) {
            probe.destroyed.store(true, Ordering::SeqCst);
        }
        self.probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(probe.clone());
        Box::new(SimEngine { probe })
    }
}

/// Let spawned pumps drain their queues
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_records_commands_in_order() {
        let sink = SimMediaSink::new();
        sink.set_source(Some("https://example.com/a.mp4"));
        sink.request_load();
        sink.pause();

        assert_eq!(
            sink.ops(),
            vec![
                SinkOp::SetSource(Some("https://example.com/a.mp4".to_string())),
                SinkOp::RequestLoad,
                SinkOp::Pause,
            ]
        );
    }

    #[tokio::test]
    async fn test_sink_play_rejection() {
        let sink = SimMediaSink::new().with_play_rejection(true);
        let err = sink.play().await.unwrap_err();
        assert_eq!(err.reason, "autoplay policy");
        assert!(sink.ops().is_empty());
    }

    #[tokio::test]
    async fn test_sink_emits_to_subscribers() {
        let sink = SimMediaSink::new();
        let mut events = sink.subscribe();
        sink.emit(SinkEvent::Waiting);
        assert!(matches!(events.recv().await, Ok(SinkEvent::Waiting)));
    }

    #[tokio::test]
    async fn test_engine_destroy_closes_event_channel() {
        let factory = SimEngineFactory::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = factory.create(&crate::config::EngineTuning::default(), tx);

        let probe = factory.probe(0).unwrap();
        probe.emit(EngineEvent::LevelSwitched { level: 1 });
        assert!(rx.recv().await.is_some());

        engine.destroy();
        assert!(probe.destroyed());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_attach_failure_mode() {
        let factory = SimEngineFactory::new().with_attach_failure(true);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut engine = factory.create(&crate::config::EngineTuning::default(), tx);
        let sink: SharedSink = Arc::new(SimMediaSink::new());
        assert!(engine.attach(sink).is_err());
    }
}
