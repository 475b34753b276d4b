// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio system boundary.
//!
//! Sound instantiation happens on the audio system's own worker thread. The
//! spawn callback handed to [`AudioSystem::request_new_sounds`] may run on
//! that thread, in any order, once per sound that was actually created.

use crate::host::assets::AssetId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a spawned sound player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Create a new random player ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Request to instantiate and play one sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundRequest {
    /// Sound asset to play
    pub asset: AssetId,
    /// Fresh player id
    pub player: PlayerId,
    /// Preview group the sound belongs to
    pub preview: Uuid,
}

/// A sound the audio system created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundHandle {
    /// Sound asset being played
    pub asset: AssetId,
    /// Player id from the request
    pub player: PlayerId,
}

/// Invoked once per spawned sound, possibly from another thread
pub type SpawnCallback = Arc<dyn Fn(SoundHandle) + Send + Sync>;

/// Current audio engine handle
pub trait AudioSystem: Send + Sync {
    /// Queue sounds for instantiation
    fn request_new_sounds(&self, requests: Vec<SoundRequest>, on_spawned: SpawnCallback);
    /// Stop every sound of a preview group
    fn stop_preview_sounds(&self, preview: Uuid);
    /// Release a spawned sound
    fn unload_sound(&self, sound: &SoundHandle);
}

/// Append-only list of sounds a preview spawned.
///
/// Shared between the evaluator and the spawn callback; it is never part
/// of the evaluation stack.
#[derive(Debug, Clone, Default)]
pub struct AliveSounds(Arc<Mutex<Vec<SoundHandle>>>);

impl AliveSounds {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a spawned sound
    pub fn push(&self, sound: SoundHandle) {
        self.0.lock().push(sound);
    }

    /// Copy of the current list
    pub fn snapshot(&self) -> Vec<SoundHandle> {
        self.0.lock().clone()
    }

    /// Take every recorded sound
    pub fn drain(&self) -> Vec<SoundHandle> {
        std::mem::take(&mut *self.0.lock())
    }

    /// Number of recorded sounds
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Whether no sound is recorded
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Callback that appends to this list
    pub fn recorder(&self) -> SpawnCallback {
        let alive = self.clone();
        Arc::new(move |sound| alive.push(sound))
    }
}
