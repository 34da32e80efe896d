//! Playhead CLI - Headless Playback Session Driver
//!
//! Features:
//! - Source classification (manifest vs progressive file)
//! - Playback path resolution under different sink capabilities
//! - Scripted session simulation against the simulated sink and engine
//! - Event log and snapshot inspection

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Playhead CLI - playback session toolkit
#[derive(Parser)]
#[command(name = "playhead-cli")]
#[command(version)]
#[command(about = "Playback session inspection and simulation toolkit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify sources and show the playback path each would take
    Classify {
        /// Source URLs to classify
        #[arg(required = true)]
        sources: Vec<String>,

        /// Assume the sink plays adaptive manifests natively
        #[arg(long)]
        native: bool,

        /// Resolve without a bundled adaptive engine available
        #[arg(long)]
        no_engine: bool,

        /// Disable adaptive playback in the session config
        #[arg(long)]
        no_adaptive: bool,
    },

    /// Run a scripted playback session and print the event log
    Simulate {
        /// Path to a JSON scenario script
        script: PathBuf,

        /// Print the final snapshot only
        #[arg(short, long)]
        quiet: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .init();

    playhead_core::init();

    match cli.command {
        Commands::Classify { sources, native, no_engine, no_adaptive } => {
            commands::classify(&sources, native, no_engine, no_adaptive, &cli.format).await?;
        }
        Commands::Simulate { script, quiet } => {
            commands::simulate(&script, quiet, &cli.format).await?;
        }
    }

    Ok(())
}
