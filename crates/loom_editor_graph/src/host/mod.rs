// SPDX-License-Identifier: MIT OR Apache-2.0
//! Boundaries to the engine services a graph evaluation drives.
//!
//! Evaluators receive these as explicit handles at construction:
//! - asset lookup by id
//! - the material object a material graph writes into
//! - the audio system a sound graph spawns sounds through

pub mod assets;
pub mod audio;
pub mod material;

pub use assets::{
    get_asset_as, Asset, AssetCast, AssetId, AssetLookup, AssetRegistry, SoundAsset, Texture,
};
pub use audio::{AliveSounds, AudioSystem, PlayerId, SoundHandle, SoundRequest, SpawnCallback};
pub use material::{Material, MaterialProperty, MaterialTarget, SharedMaterial};
