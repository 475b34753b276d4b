// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime settings shared by the evaluators.
//!
//! Stored as RON. Every field has a default so partial files load.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a random sound node bounds its pick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RandomRange {
    /// Pick among the inputs that resolved to a sound player
    #[default]
    ResolvedCandidates,
    /// Pick over every declared input, even unmapped ones
    DeclaredInputs,
}

/// Settings the evaluators read at construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Fixed seed for random nodes, reapplied before every pass
    pub random_seed: Option<u64>,
    /// Selection range of random sound nodes
    pub random_range: RandomRange,
}

impl RuntimeSettings {
    /// Settings with a fixed random seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            random_seed: Some(seed),
            ..Self::default()
        }
    }

    /// Replace the random selection range
    pub fn with_random_range(mut self, random_range: RandomRange) -> Self {
        self.random_range = random_range;
        self
    }

    /// Parse from RON text
    pub fn from_ron(text: &str) -> Result<Self, SettingsError> {
        Ok(ron::from_str(text)?)
    }

    /// Render as RON text
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save to a RON file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

/// Error loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Value could not be rendered
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings = RuntimeSettings::from_ron("(random_seed: Some(7))").unwrap();
        assert_eq!(settings, RuntimeSettings::seeded(7));
        assert_eq!(settings.random_range, RandomRange::ResolvedCandidates);

        let settings = RuntimeSettings::from_ron("(random_range: DeclaredInputs)").unwrap();
        assert_eq!(settings.random_seed, None);
        assert_eq!(settings.random_range, RandomRange::DeclaredInputs);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.ron");
        let settings = RuntimeSettings::seeded(42).with_random_range(RandomRange::DeclaredInputs);

        settings.save(&path).unwrap();
        assert_eq!(RuntimeSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(
            RuntimeSettings::from_ron("(random_seed: \"x\")"),
            Err(SettingsError::Parse(_))
        ));
        assert!(matches!(
            RuntimeSettings::load(Path::new("/nonexistent/runtime.ron")),
            Err(SettingsError::Io(_))
        ));
    }
}
