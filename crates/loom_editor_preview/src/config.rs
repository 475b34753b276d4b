// SPDX-License-Identifier: MIT OR Apache-2.0
//! Preview configuration.
//!
//! A single RON file lists the assets to register, the graphs to evaluate
//! and the runtime settings handed to every evaluator.

use loom_editor_graph::evaluation::Domain;
use loom_editor_graph::host::{Asset, AssetId, SoundAsset, Texture};
use loom_editor_graph::RuntimeSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level preview configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Fallback log filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Directory holding node caches
    pub cache_dir: PathBuf,
    /// Simulated time the audio worker takes to start a sound
    pub audio_latency_ms: u64,
    /// Evaluator settings
    pub runtime: RuntimeSettings,
    /// Assets available to the graphs
    pub assets: Vec<AssetEntry>,
    /// Graphs to evaluate, in order
    pub graphs: Vec<GraphEntry>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            cache_dir: PathBuf::from("node_cache"),
            audio_latency_ms: 10,
            runtime: RuntimeSettings::default(),
            assets: Vec::new(),
            graphs: Vec::new(),
        }
    }
}

impl PreviewConfig {
    /// Load from a RON file; a relative cache dir resolves against the file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_ron(&content)?;
        if config.cache_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.cache_dir = parent.join(&config.cache_dir);
            }
        }
        Ok(config)
    }

    /// Parse from RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }
}

/// Asset registered before evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssetEntry {
    /// Texture descriptor
    Texture {
        /// Asset id
        id: AssetId,
        /// Display name
        name: String,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Sound file
    Sound {
        /// Asset id
        id: AssetId,
        /// Display name
        name: String,
        /// Audio file
        path: PathBuf,
    },
}

impl From<AssetEntry> for Asset {
    fn from(entry: AssetEntry) -> Self {
        match entry {
            AssetEntry::Texture {
                id,
                name,
                width,
                height,
            } => Asset::Texture(Texture {
                id,
                name,
                width,
                height,
            }),
            AssetEntry::Sound { id, name, path } => Asset::Sound(SoundAsset { id, name, path }),
        }
    }
}

/// Graph to preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntry {
    /// Asset the graph edits; also names its node cache
    pub asset: AssetId,
    /// Display name
    pub name: String,
    /// Domain and domain inputs
    pub kind: GraphKind,
}

/// Domain of a previewed graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphKind {
    /// Material graph over a material with this base albedo
    Material {
        /// Base albedo color
        albedo: [f32; 3],
    },
    /// Sound graph
    Sound,
}

impl GraphKind {
    /// Evaluation domain
    pub fn domain(&self) -> Domain {
        match self {
            Self::Material { .. } => Domain::Material,
            Self::Sound => Domain::Sound,
        }
    }
}

/// Error loading the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}
