//! Drive a playback session end to end against the simulated sink and engine.
//!
//! ```bash
//! cargo run --example scripted_session
//! ```

use anyhow::Context;
use playhead_core::sim::{settle, SimEngineFactory, SimMediaSink};
use playhead_core::{EngineEvent, EngineLevel, PlayerSession, SessionConfig, SinkEvent};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let sink = Arc::new(SimMediaSink::new());
    let factory = Arc::new(SimEngineFactory::new());
    let session = PlayerSession::new(
        SessionConfig {
            autoplay: true,
            ..SessionConfig::default()
        },
        sink.clone(),
        Some(factory.clone()),
    )?;
    let mut events = session.subscribe();

    session
        .set_source(Some("https://stream.example.com/live/master.m3u8"))
        .await?;
    let probe = factory.probe(0).context("engine not created")?;

    probe.emit(EngineEvent::ManifestParsed {
        levels: vec![
            EngineLevel {
                width: 640,
                height: 360,
                bitrate: 800_000,
            },
            EngineLevel {
                width: 1280,
                height: 720,
                bitrate: 2_500_000,
            },
            EngineLevel {
                width: 1920,
                height: 1080,
                bitrate: 5_000_000,
            },
        ],
    });
    settle().await;

    sink.emit(SinkEvent::DurationChange {
        duration: f64::INFINITY,
    });
    sink.emit(SinkEvent::TimeUpdate { position: 12.0 });
    probe.emit(EngineEvent::LevelSwitched { level: 1 });
    settle().await;

    let snapshot = session.snapshot().await;
    println!("Path:       {}", session.path().await);
    println!("Phase:      {}", session.phase().await);
    println!("Live:       {}", snapshot.is_live);
    println!("Playing:    {}", snapshot.is_playing);
    println!("Renditions: {}", snapshot.renditions.len());
    for r in &snapshot.renditions {
        println!(
            "  {}. {} -- {} bps, {}x{}",
            r.id, r.display_name, r.bitrate, r.width, r.height
        );
    }

    println!("\nEvents:");
    while let Ok(event) = events.try_recv() {
        println!("  {}", serde_json::to_string(&event)?);
    }

    Ok(())
}
