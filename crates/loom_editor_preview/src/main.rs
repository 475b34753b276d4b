// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loom Editor headless graph preview.
//!
//! Loads material and sound graphs from their node caches, evaluates them
//! against an in-memory asset registry and a worker-thread audio system,
//! and logs what each pass produced.

mod audio_worker;
mod config;
mod preview;

use anyhow::{Context, Result};
use audio_worker::WorkerAudioSystem;
use clap::Parser;
use config::{GraphKind, PreviewConfig};
use loom_editor_graph::host::AssetRegistry;
use loom_editor_graph::CompilationStatus;
use preview::PreviewHost;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Evaluate Loom Editor node graphs without the editor")]
struct Args {
    /// Preview configuration (RON)
    config: PathBuf,

    /// How long to wait for sound graphs to finish spawning
    #[arg(long, default_value_t = 500)]
    wait_ms: u64,

    /// Build and save default graphs for assets without a node cache
    #[arg(long)]
    write_defaults: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = PreviewConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)?,
    };
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Loom preview v{}", env!("CARGO_PKG_VERSION"));

    let assets = Arc::new(AssetRegistry::new());
    for entry in config.assets.iter().cloned() {
        assets.insert(entry.into());
    }
    tracing::info!(count = assets.len(), "Registered assets");

    let audio = Arc::new(
        WorkerAudioSystem::spawn(assets.clone(), Duration::from_millis(config.audio_latency_ms))
            .context("Failed to start the audio worker")?,
    );
    let host = PreviewHost::new(&config, assets, audio.clone());
    let wait = Duration::from_millis(args.wait_ms);

    let mut failed = 0;
    for entry in &config.graphs {
        let mut graph = match host.open(entry, args.write_defaults) {
            Ok(graph) => graph,
            Err(e) => {
                tracing::error!(graph = %entry.name, "Cannot open graph: {e}");
                failed += 1;
                continue;
            }
        };

        let status = graph.editor.evaluate();
        if status == CompilationStatus::Failed {
            failed += 1;
        }

        match entry.kind {
            GraphKind::Material { .. } => {
                for (name, value) in graph.material_overrides() {
                    tracing::info!(
                        graph = %graph.name,
                        property = %name,
                        ?value,
                        "Material override"
                    );
                }
            }
            GraphKind::Sound => {
                if !audio.flush(wait) {
                    tracing::warn!(graph = %graph.name, "Audio worker did not finish in {wait:?}");
                }
                tracing::info!(
                    graph = %graph.name,
                    alive = graph.alive_sounds(),
                    playing = audio.playing().len(),
                    "Sounds spawned"
                );
            }
        }
        tracing::info!(
            graph = %graph.name,
            domain = ?entry.kind.domain(),
            ?status,
            "Preview finished"
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} graphs failed", config.graphs.len());
    }
    Ok(())
}
