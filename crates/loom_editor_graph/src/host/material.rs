// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material object boundary.
//!
//! Material graphs stage overrides on a [`MaterialTarget`] and commit them
//! with [`MaterialTarget::apply_changes`] at the end of a pass.

use crate::host::assets::{AssetId, Texture};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Albedo color property name
pub const ALBEDO_COLOR: &str = "AlbedoColor";
/// Albedo texture property name
pub const ALBEDO_MAP: &str = "AlbedoMap";
/// Normal map property name
pub const NORMAL_MAP: &str = "NormalMap";
/// Metallic map property name
pub const METALLIC_MAP: &str = "MetallicMap";
/// Roughness map property name
pub const ROUGHNESS_MAP: &str = "RoughnessMap";
/// Emissive color property name
pub const EMISSIVE: &str = "Emissive";

/// Shared handle to a material mutated by evaluation
pub type SharedMaterial = Arc<Mutex<dyn MaterialTarget>>;

/// Value of a named material property
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaterialProperty {
    /// Scalar
    Float(f32),
    /// RGB color
    Vec3([f32; 3]),
    /// Texture reference
    Texture(AssetId),
}

/// Material object mutated by a material graph
pub trait MaterialTarget: Send {
    /// Drop every pending and applied texture/color override
    fn reset(&mut self);
    /// Stage an albedo color
    fn set_albedo_color(&mut self, color: [f32; 3]);
    /// Stage an albedo texture
    fn set_albedo_map(&mut self, texture: &Texture);
    /// Stage a normal map
    fn set_normal_map(&mut self, texture: &Texture);
    /// Stage a metallic map
    fn set_metallic_map(&mut self, texture: &Texture);
    /// Stage a roughness map
    fn set_roughness_map(&mut self, texture: &Texture);
    /// Stage an emissive color
    fn set_emissive(&mut self, color: [f32; 3]);
    /// Commit staged overrides
    fn apply_changes(&mut self);
    /// Read a named property
    fn get(&self, name: &str) -> Option<MaterialProperty>;
}

/// In-memory material asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Asset id
    pub id: AssetId,
    /// Display name
    pub name: String,
    base: IndexMap<String, MaterialProperty>,
    applied: IndexMap<String, MaterialProperty>,
    pending: IndexMap<String, MaterialProperty>,
}

impl Material {
    /// Create a material with a base albedo color
    pub fn new(name: impl Into<String>, albedo: [f32; 3]) -> Self {
        let mut base = IndexMap::new();
        base.insert(ALBEDO_COLOR.to_string(), MaterialProperty::Vec3(albedo));
        Self {
            id: AssetId::new(),
            name: name.into(),
            base,
            applied: IndexMap::new(),
            pending: IndexMap::new(),
        }
    }

    /// Wrap into the shared handle evaluators take
    pub fn into_shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    /// Committed overrides in the order they were first set
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &MaterialProperty)> {
        self.applied.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether staged changes await [`MaterialTarget::apply_changes`]
    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    fn stage(&mut self, name: &str, value: MaterialProperty) {
        self.pending.insert(name.to_string(), value);
    }
}

impl MaterialTarget for Material {
    fn reset(&mut self) {
        self.pending.clear();
        self.applied.clear();
    }

    fn set_albedo_color(&mut self, color: [f32; 3]) {
        self.stage(ALBEDO_COLOR, MaterialProperty::Vec3(color));
    }

    fn set_albedo_map(&mut self, texture: &Texture) {
        self.stage(ALBEDO_MAP, MaterialProperty::Texture(texture.id));
    }

    fn set_normal_map(&mut self, texture: &Texture) {
        self.stage(NORMAL_MAP, MaterialProperty::Texture(texture.id));
    }

    fn set_metallic_map(&mut self, texture: &Texture) {
        self.stage(METALLIC_MAP, MaterialProperty::Texture(texture.id));
    }

    fn set_roughness_map(&mut self, texture: &Texture) {
        self.stage(ROUGHNESS_MAP, MaterialProperty::Texture(texture.id));
    }

    fn set_emissive(&mut self, color: [f32; 3]) {
        self.stage(EMISSIVE, MaterialProperty::Vec3(color));
    }

    fn apply_changes(&mut self) {
        for (name, value) in self.pending.drain(..) {
            self.applied.insert(name, value);
        }
    }

    fn get(&self, name: &str) -> Option<MaterialProperty> {
        self.applied
            .get(name)
            .or_else(|| self.base.get(name))
            .copied()
    }
}
