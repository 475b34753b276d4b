// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio system running on its own worker thread.
//!
//! Commands travel over an unbounded channel to a thread driving a
//! current-thread tokio runtime. Spawn callbacks run on that thread.

use loom_editor_graph::host::{
    get_asset_as, AssetLookup, AudioSystem, SoundAsset, SoundHandle, SoundRequest, SpawnCallback,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A sound the worker considers playing
#[derive(Debug, Clone, PartialEq)]
pub struct PlayingSound {
    /// Spawned sound
    pub handle: SoundHandle,
    /// Preview group
    pub preview: Uuid,
    /// Sound name
    pub name: String,
}

enum AudioCommand {
    Spawn {
        requests: Vec<SoundRequest>,
        on_spawned: SpawnCallback,
    },
    Stop(Uuid),
    Unload(SoundHandle),
    Flush(std::sync::mpsc::SyncSender<()>),
}

/// [`AudioSystem`] backed by a worker thread
pub struct WorkerAudioSystem {
    commands: mpsc::UnboundedSender<AudioCommand>,
    playing: Arc<Mutex<Vec<PlayingSound>>>,
}

impl WorkerAudioSystem {
    /// Start the worker; each sound takes `latency` to start
    pub fn spawn(assets: Arc<dyn AssetLookup>, latency: Duration) -> std::io::Result<Self> {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let playing = Arc::new(Mutex::new(Vec::new()));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let worker_playing = playing.clone();
        std::thread::Builder::new()
            .name("audio-worker".to_string())
            .spawn(move || {
                runtime.block_on(audio_worker(command_rx, assets, worker_playing, latency));
            })?;

        Ok(Self { commands, playing })
    }

    /// Sounds currently playing
    pub fn playing(&self) -> Vec<PlayingSound> {
        self.playing.lock().clone()
    }

    /// Wait until every command sent so far has been handled
    pub fn flush(&self, timeout: Duration) -> bool {
        let (done, wait) = std::sync::mpsc::sync_channel(1);
        if self.commands.send(AudioCommand::Flush(done)).is_err() {
            return false;
        }
        wait.recv_timeout(timeout).is_ok()
    }

    fn send(&self, command: AudioCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Audio worker has stopped, dropping command");
        }
    }
}

impl AudioSystem for WorkerAudioSystem {
    fn request_new_sounds(&self, requests: Vec<SoundRequest>, on_spawned: SpawnCallback) {
        self.send(AudioCommand::Spawn { requests, on_spawned });
    }

    fn stop_preview_sounds(&self, preview: Uuid) {
        self.send(AudioCommand::Stop(preview));
    }

    fn unload_sound(&self, sound: &SoundHandle) {
        self.send(AudioCommand::Unload(*sound));
    }
}

/// Worker loop processing audio commands in order
async fn audio_worker(
    mut command_rx: mpsc::UnboundedReceiver<AudioCommand>,
    assets: Arc<dyn AssetLookup>,
    playing: Arc<Mutex<Vec<PlayingSound>>>,
    latency: Duration,
) {
    while let Some(command) = command_rx.recv().await {
        match command {
            AudioCommand::Spawn { requests, on_spawned } => {
                for request in requests {
                    let sound = get_asset_as::<SoundAsset>(assets.as_ref(), request.asset);
                    let Some(sound) = sound else {
                        tracing::warn!(asset = %request.asset, "Cannot spawn unknown sound");
                        continue;
                    };
                    tokio::time::sleep(latency).await;

                    let handle = SoundHandle {
                        asset: request.asset,
                        player: request.player,
                    };
                    tracing::debug!(
                        sound = %sound.name,
                        path = %sound.path.display(),
                        "Sound started"
                    );
                    playing.lock().push(PlayingSound {
                        handle,
                        preview: request.preview,
                        name: sound.name,
                    });
                    on_spawned(handle);
                }
            }
            AudioCommand::Stop(preview) => {
                playing.lock().retain(|p| p.preview != preview);
            }
            AudioCommand::Unload(handle) => {
                playing.lock().retain(|p| p.handle != handle);
            }
            AudioCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Audio worker stopped");
}
