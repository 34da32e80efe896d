//! CLI command implementations

use anyhow::Context;
use chrono::Utc;
use playhead_core::sim::{settle, SimEngineFactory, SimMediaSink};
use playhead_core::{
    resolver, EngineError, EngineErrorCategory, EngineEvent, EngineFactory, EngineLevel,
    PlayerSession, SessionConfig, SinkEvent, SourceKind,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::debug;

use crate::output::OutputFormat;

#[derive(Serialize, Tabled)]
struct ClassifyRow {
    source: String,
    kind: String,
    path: String,
    error: String,
}

/// Classify sources and resolve the playback path each would take
pub async fn classify(
    sources: &[String],
    native: bool,
    no_engine: bool,
    no_adaptive: bool,
    format: &str,
) -> anyhow::Result<()> {
    let mut rows = Vec::new();

    for source in sources {
        let kind = resolver::classify(source);
        let sink = Arc::new(SimMediaSink::new().with_native_adaptive(native));
        let factory: Option<Arc<dyn EngineFactory>> = if no_engine {
            None
        } else {
            Some(Arc::new(SimEngineFactory::new()))
        };
        let config = SessionConfig {
            adaptive_enabled: !no_adaptive,
            ..SessionConfig::default()
        };

        let session = PlayerSession::new(config, sink, factory)?;
        session.set_source(Some(source.as_str())).await?;

        let snapshot = session.snapshot().await;
        rows.push(ClassifyRow {
            source: source.clone(),
            kind: match kind {
                SourceKind::Manifest => "manifest".to_string(),
                SourceKind::File => "file".to_string(),
            },
            path: session.path().await.to_string(),
            error: snapshot
                .error
                .map(|e| e.kind.code().to_string())
                .unwrap_or_default(),
        });
    }

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text | OutputFormat::Table => println!("{}", Table::new(&rows)),
    }

    Ok(())
}

/// A scripted playback scenario
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    #[serde(default)]
    config: SessionConfig,
    /// Sink claims native adaptive support
    #[serde(default)]
    native_adaptive: bool,
    /// Provide an adaptive engine factory to the session
    #[serde(default = "default_true")]
    with_engine: bool,
    steps: Vec<Step>,
}

fn default_true() -> bool {
    true
}

/// One scripted action: a session command, a sink event, or an engine event
#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
enum Step {
    // Session commands
    SetSource { url: String },
    ClearSource,
    Play,
    Pause,
    Seek { seconds: f64 },
    SetVolume { volume: f64 },
    ToggleMute,
    SetRate { rate: f64 },
    SetQuality { level: i32 },
    SeekLiveEdge,

    // Sink events
    CanPlay,
    Playing,
    Waiting,
    TimeUpdate { position: f64 },
    /// Omit `duration` to signal a live stream
    DurationChange {
        #[serde(default)]
        duration: Option<f64>,
    },
    Ended,

    // Engine events
    ManifestParsed { levels: Vec<EngineLevel> },
    LevelSwitched { level: i32 },
    EngineError {
        fatal: bool,
        category: EngineErrorCategory,
        message: String,
    },

    // Clock control
    Wait { millis: u64 },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationReport {
    session_id: String,
    path: String,
    phase: String,
    snapshot: playhead_core::PlaybackSnapshot,
    events: Vec<playhead_core::PlayerEvent>,
}

/// Run a scripted playback session and report what happened
pub async fn simulate(script: &Path, quiet: bool, format: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(script)
        .with_context(|| format!("reading scenario script {}", script.display()))?;
    let scenario: Scenario =
        serde_json::from_str(&raw).context("parsing scenario script")?;

    let sink = Arc::new(SimMediaSink::new().with_native_adaptive(scenario.native_adaptive));
    let factory = Arc::new(SimEngineFactory::new());
    let engine_factory: Option<Arc<dyn EngineFactory>> = if scenario.with_engine {
        Some(factory.clone())
    } else {
        None
    };

    let session = PlayerSession::new(scenario.config, sink.clone(), engine_factory)?;
    let mut events_rx = session.subscribe();

    println!(
        "Session {} started at {}",
        session.id(),
        Utc::now().to_rfc3339()
    );

    let latest_probe = || factory.probe(factory.created().saturating_sub(1));

    for step in scenario.steps {
        debug!(step = ?step, "Executing step");
        match step {
            Step::SetSource { url } => {
                if let Err(e) = session.set_source(Some(&url)).await {
                    println!("  ! set_source failed: {e}");
                }
            }
            Step::ClearSource => {
                if let Err(e) = session.set_source(None).await {
                    println!("  ! clear_source failed: {e}");
                }
            }
            Step::Play => session.play().await,
            Step::Pause => session.pause().await,
            Step::Seek { seconds } => session.seek(seconds).await,
            Step::SetVolume { volume } => session.set_volume(volume).await,
            Step::ToggleMute => session.toggle_mute().await,
            Step::SetRate { rate } => session.set_playback_rate(rate).await,
            Step::SetQuality { level } => {
                if let Err(e) = session.set_quality_level(level).await {
                    println!("  ! set_quality failed: {e}");
                }
            }
            Step::SeekLiveEdge => session.seek_to_live_edge().await,

            Step::CanPlay => sink.emit(SinkEvent::CanPlay),
            Step::Playing => sink.emit(SinkEvent::Playing),
            Step::Waiting => sink.emit(SinkEvent::Waiting),
            Step::TimeUpdate { position } => sink.emit(SinkEvent::TimeUpdate { position }),
            Step::DurationChange { duration } => sink.emit(SinkEvent::DurationChange {
                duration: duration.unwrap_or(f64::INFINITY),
            }),
            Step::Ended => sink.emit(SinkEvent::Ended),

            Step::ManifestParsed { levels } => match latest_probe() {
                Some(probe) => probe.emit(EngineEvent::ManifestParsed { levels }),
                None => println!("  ! no engine active"),
            },
            Step::LevelSwitched { level } => match latest_probe() {
                Some(probe) => probe.emit(EngineEvent::LevelSwitched { level }),
                None => println!("  ! no engine active"),
            },
            Step::EngineError {
                fatal,
                category,
                message,
            } => match latest_probe() {
                Some(probe) => probe.emit(EngineEvent::Error(EngineError {
                    fatal,
                    category,
                    message,
                })),
                None => println!("  ! no engine active"),
            },

            Step::Wait { millis } => tokio::time::sleep(Duration::from_millis(millis)).await,
        }
        settle().await;
    }

    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(event);
    }

    let snapshot = session.snapshot().await;
    let path = session.path().await;
    let phase = session.phase().await;

    match OutputFormat::from(format) {
        OutputFormat::Json => {
            let report = SimulationReport {
                session_id: session.id().to_string(),
                path: path.to_string(),
                phase: phase.to_string(),
                snapshot,
                events,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text | OutputFormat::Table => {
            if !quiet {
                println!("\nEvent Log ({} events):", events.len());
                for (i, event) in events.iter().enumerate() {
                    println!("  {:>3}. {}", i + 1, serde_json::to_string(event)?);
                }
            }

            println!("\nFinal State:");
            println!("  Phase:     {}", phase);
            println!("  Path:      {}", path);
            println!("  Playing:   {}", snapshot.is_playing);
            println!("  Buffering: {}", snapshot.is_buffering);
            println!("  Live:      {}", snapshot.is_live);
            println!(
                "  Time:      {:.1}s / {:.1}s",
                snapshot.current_time, snapshot.duration
            );
            println!(
                "  Volume:    {:.2} (muted: {})",
                snapshot.volume, snapshot.is_muted
            );
            println!("  Rate:      {:.2}", snapshot.playback_rate);
            match &snapshot.error {
                Some(error) => println!("  Error:     {}", error),
                None => println!("  Error:     none"),
            }
            if !snapshot.renditions.is_empty() {
                println!(
                    "  Renditions (active {}):",
                    if snapshot.active_rendition < 0 {
                        "auto".to_string()
                    } else {
                        snapshot.active_rendition.to_string()
                    }
                );
                for rendition in &snapshot.renditions {
                    println!(
                        "    [{}] {:>8}  {}x{}  {} bps",
                        rendition.id,
                        rendition.display_name,
                        rendition.width,
                        rendition.height,
                        rendition.bitrate
                    );
                }
            }
        }
    }

    Ok(())
}
