// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixtures shared by the unit tests.

use crate::host::{
    Asset, AssetId, AssetRegistry, AudioSystem, SoundAsset, SoundHandle, SoundRequest,
    SpawnCallback, Texture,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::thread::JoinHandle;
use uuid::Uuid;

/// Register a 4x4 texture named `name`
pub(crate) fn texture(registry: &AssetRegistry, name: &str) -> AssetId {
    registry.insert(Asset::Texture(Texture {
        id: AssetId::new(),
        name: name.to_string(),
        width: 4,
        height: 4,
    }))
}

/// Register a sound named `name`
pub(crate) fn sound(registry: &AssetRegistry, name: &str) -> AssetId {
    registry.insert(Asset::Sound(SoundAsset {
        id: AssetId::new(),
        name: name.to_string(),
        path: PathBuf::from(format!("{name}.ogg")),
    }))
}

/// Audio system spawning every request synchronously and recording calls
#[derive(Default)]
pub(crate) struct RecordingAudio {
    pub requests: Mutex<Vec<Vec<SoundRequest>>>,
    pub stopped: Mutex<Vec<Uuid>>,
    pub unloaded: Mutex<Vec<SoundHandle>>,
}

impl RecordingAudio {
    /// Asset ids of the most recent batch, in request order
    pub fn last_batch(&self) -> Vec<AssetId> {
        self.requests
            .lock()
            .last()
            .map(|batch| batch.iter().map(|r| r.asset).collect())
            .unwrap_or_default()
    }
}

impl AudioSystem for RecordingAudio {
    fn request_new_sounds(&self, requests: Vec<SoundRequest>, on_spawned: SpawnCallback) {
        for request in &requests {
            on_spawned(SoundHandle {
                asset: request.asset,
                player: request.player,
            });
        }
        self.requests.lock().push(requests);
    }

    fn stop_preview_sounds(&self, preview: Uuid) {
        self.stopped.lock().push(preview);
    }

    fn unload_sound(&self, sound: &SoundHandle) {
        self.unloaded.lock().push(*sound);
    }
}

/// Audio system holding requests until [`DeferredAudio::spawn_pending`]
#[derive(Default)]
pub(crate) struct DeferredAudio {
    pending: Mutex<Vec<(Vec<SoundRequest>, SpawnCallback)>>,
    requested: Mutex<Vec<SoundRequest>>,
    pub unloaded: Mutex<Vec<SoundHandle>>,
}

impl DeferredAudio {
    /// Every request received so far, in order
    pub fn requested(&self) -> Vec<SoundRequest> {
        self.requested.lock().clone()
    }

    /// Run the spawn callbacks of every queued request
    pub fn spawn_pending(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for (requests, on_spawned) in pending {
            for request in requests {
                on_spawned(SoundHandle {
                    asset: request.asset,
                    player: request.player,
                });
            }
        }
    }
}

impl AudioSystem for DeferredAudio {
    fn request_new_sounds(&self, requests: Vec<SoundRequest>, on_spawned: SpawnCallback) {
        self.requested.lock().extend(requests.iter().copied());
        self.pending.lock().push((requests, on_spawned));
    }

    fn stop_preview_sounds(&self, _preview: Uuid) {}

    fn unload_sound(&self, sound: &SoundHandle) {
        self.unloaded.lock().push(*sound);
    }
}

/// Audio system spawning each sound from its own thread
#[derive(Default)]
pub(crate) struct ThreadedAudio {
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadedAudio {
    /// Block until every spawn callback ran
    pub fn wait(&self) {
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            worker.join().unwrap();
        }
    }
}

impl AudioSystem for ThreadedAudio {
    fn request_new_sounds(&self, requests: Vec<SoundRequest>, on_spawned: SpawnCallback) {
        let mut workers = self.workers.lock();
        for request in requests {
            let on_spawned = on_spawned.clone();
            workers.push(std::thread::spawn(move || {
                on_spawned(SoundHandle {
                    asset: request.asset,
                    player: request.player,
                });
            }));
        }
    }

    fn stop_preview_sounds(&self, _preview: Uuid) {}

    fn unload_sound(&self, _sound: &SoundHandle) {}
}
