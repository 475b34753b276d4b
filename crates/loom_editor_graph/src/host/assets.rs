// SPDX-License-Identifier: MIT OR Apache-2.0
//! Asset lookup boundary.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub Uuid);

impl AssetId {
    /// Create a new random asset ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Rebuild an id from its packed form
    pub const fn from_u128(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }

    /// Packed form used in extra-data buffers
    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Texture descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texture {
    /// Asset id
    pub id: AssetId,
    /// Display name
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Sound asset descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundAsset {
    /// Asset id
    pub id: AssetId,
    /// Display name
    pub name: String,
    /// Source file
    pub path: PathBuf,
}

/// An asset resolvable by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Asset {
    /// 2D texture
    Texture(Texture),
    /// Sound clip
    Sound(SoundAsset),
}

impl Asset {
    /// Asset id
    pub fn id(&self) -> AssetId {
        match self {
            Self::Texture(t) => t.id,
            Self::Sound(s) => s.id,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            Self::Texture(t) => &t.name,
            Self::Sound(s) => &s.name,
        }
    }
}

/// Typed view into an [`Asset`]
pub trait AssetCast: Clone {
    /// Borrow the typed asset if the variant matches
    fn cast(asset: &Asset) -> Option<&Self>;
}

impl AssetCast for Texture {
    fn cast(asset: &Asset) -> Option<&Self> {
        match asset {
            Asset::Texture(t) => Some(t),
            Asset::Sound(_) => None,
        }
    }
}

impl AssetCast for SoundAsset {
    fn cast(asset: &Asset) -> Option<&Self> {
        match asset {
            Asset::Sound(s) => Some(s),
            Asset::Texture(_) => None,
        }
    }
}

/// Find/create asset by id
pub trait AssetLookup: Send + Sync {
    /// Resolve an asset, `None` if unknown
    fn find_asset(&self, id: AssetId) -> Option<Arc<Asset>>;
}

/// Resolve an asset and check its type
pub fn get_asset_as<T: AssetCast>(lookup: &dyn AssetLookup, id: AssetId) -> Option<T> {
    let asset = lookup.find_asset(id)?;
    T::cast(&asset).cloned()
}

/// In-memory asset registry
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: RwLock<IndexMap<AssetId, Arc<Asset>>>,
}

impl AssetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset, returning its id
    pub fn insert(&self, asset: Asset) -> AssetId {
        let id = asset.id();
        self.assets.write().insert(id, Arc::new(asset));
        id
    }

    /// Forget an asset
    pub fn remove(&self, id: AssetId) -> Option<Arc<Asset>> {
        self.assets.write().shift_remove(&id)
    }

    /// Number of registered assets
    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }
}

impl AssetLookup for AssetRegistry {
    fn find_asset(&self, id: AssetId) -> Option<Arc<Asset>> {
        self.assets.read().get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_lookup() {
        let registry = AssetRegistry::new();
        let texture = registry.insert(Asset::Texture(Texture {
            id: AssetId::new(),
            name: "bricks".into(),
            width: 64,
            height: 64,
        }));
        let sound = registry.insert(Asset::Sound(SoundAsset {
            id: AssetId::new(),
            name: "step".into(),
            path: "sfx/step.wav".into(),
        }));

        assert_eq!(get_asset_as::<Texture>(&registry, texture).unwrap().width, 64);
        assert!(get_asset_as::<SoundAsset>(&registry, texture).is_none());
        assert_eq!(get_asset_as::<SoundAsset>(&registry, sound).unwrap().name, "step");
        assert!(registry.find_asset(AssetId::new()).is_none());

        registry.remove(texture);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_packed_round_trip() {
        let id = AssetId::new();
        assert_eq!(AssetId::from_u128(id.as_u128()), id);
    }
}
