// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loading graphs and attaching their runtimes.

use crate::config::{GraphEntry, GraphKind, PreviewConfig};
use loom_editor_graph::cache::{load_node_cache, save_node_cache};
use loom_editor_graph::evaluation::Runtime;
use loom_editor_graph::graphs::{material, sound, BuildError};
use loom_editor_graph::host::{AssetId, AssetRegistry, AudioSystem, Material, MaterialProperty};
use loom_editor_graph::{CacheError, MaterialEvaluator, NodeEditor, RuntimeSettings, SoundEvaluator};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Error preparing a graph for preview
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// Node cache could not be read or written
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Default graph could not be built
    #[error(transparent)]
    Build(#[from] BuildError),

    /// No node cache and defaults were not requested
    #[error("No node cache for asset {0}")]
    NoCache(AssetId),

    /// Graph has no output node
    #[error("Graph of asset {0} has no output node")]
    NoOutput(AssetId),
}

/// A graph ready to evaluate
pub struct PreviewGraph {
    /// Display name
    pub name: String,
    /// Graph with its runtime attached
    pub editor: NodeEditor,
    material: Option<Arc<Mutex<Material>>>,
}

impl PreviewGraph {
    /// Committed material overrides, empty for sound graphs
    pub fn material_overrides(&self) -> Vec<(String, MaterialProperty)> {
        self.material
            .as_ref()
            .map(|m| m.lock().overrides().map(|(k, v)| (k.to_string(), *v)).collect())
            .unwrap_or_default()
    }

    /// Sounds spawned so far, zero for material graphs
    pub fn alive_sounds(&self) -> usize {
        self.editor
            .runtime()
            .and_then(Runtime::as_sound)
            .map_or(0, |s| s.alive_sounds().len())
    }
}

/// Shared services the previewed graphs run against
pub struct PreviewHost {
    assets: Arc<AssetRegistry>,
    audio: Arc<dyn AudioSystem>,
    settings: RuntimeSettings,
    cache_dir: PathBuf,
}

impl PreviewHost {
    /// Create a host from the configuration
    pub fn new(
        config: &PreviewConfig,
        assets: Arc<AssetRegistry>,
        audio: Arc<dyn AudioSystem>,
    ) -> Self {
        Self {
            assets,
            audio,
            settings: config.runtime.clone(),
            cache_dir: config.cache_dir.clone(),
        }
    }

    /// Load a graph from its node cache and attach the domain runtime.
    ///
    /// With `write_defaults`, a missing cache is replaced by the domain's
    /// default graph, which is saved for the next run.
    pub fn open(
        &self,
        entry: &GraphEntry,
        write_defaults: bool,
    ) -> Result<PreviewGraph, PreviewError> {
        match &entry.kind {
            GraphKind::Material { albedo } => {
                let mut base = Material::new(entry.name.clone(), *albedo);
                base.id = entry.asset;

                let mut editor = self.load_or_build(entry, write_defaults, |editor| {
                    material::build_default_graph(editor, &base).map(|_| ())
                })?;
                let output =
                    material::find_output(&editor).ok_or(PreviewError::NoOutput(entry.asset))?;

                let shared = base.into_shared();
                editor.set_runtime(MaterialEvaluator::new(
                    output,
                    self.assets.clone(),
                    shared.clone(),
                ));
                Ok(PreviewGraph {
                    name: entry.name.clone(),
                    editor,
                    material: Some(shared),
                })
            }
            GraphKind::Sound => {
                let mut editor = self.load_or_build(entry, write_defaults, |editor| {
                    sound::build_default_graph(editor);
                    Ok(())
                })?;
                let output =
                    sound::find_output(&editor).ok_or(PreviewError::NoOutput(entry.asset))?;

                editor.set_runtime(SoundEvaluator::new(
                    output,
                    self.assets.clone(),
                    self.audio.clone(),
                    self.settings.clone(),
                ));
                Ok(PreviewGraph {
                    name: entry.name.clone(),
                    editor,
                    material: None,
                })
            }
        }
    }

    fn load_or_build(
        &self,
        entry: &GraphEntry,
        write_defaults: bool,
        build: impl FnOnce(&mut NodeEditor) -> Result<(), BuildError>,
    ) -> Result<NodeEditor, PreviewError> {
        if let Some(editor) = load_node_cache(&self.cache_dir, entry.asset)? {
            return Ok(editor);
        }
        if !write_defaults {
            return Err(PreviewError::NoCache(entry.asset));
        }

        let mut editor = NodeEditor::new(entry.name.clone());
        build(&mut editor)?;
        let path = save_node_cache(&self.cache_dir, entry.asset, &editor)?;
        tracing::info!(graph = %entry.name, path = %path.display(), "Wrote default graph");
        Ok(editor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_worker::WorkerAudioSystem;
    use loom_editor_graph::graphs::connect;
    use loom_editor_graph::host::material::ALBEDO_COLOR;
    use loom_editor_graph::host::{Asset, SoundAsset};
    use loom_editor_graph::{CompilationStatus, EvaluationError};
    use std::time::Duration;

    struct Setup {
        _dir: tempfile::TempDir,
        config: PreviewConfig,
        assets: Arc<AssetRegistry>,
        audio: Arc<WorkerAudioSystem>,
    }

    fn setup() -> Setup {
        setup_with_latency(Duration::ZERO)
    }

    fn setup_with_latency(latency: Duration) -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let config = PreviewConfig {
            cache_dir: dir.path().join("cache"),
            runtime: RuntimeSettings::seeded(3),
            ..PreviewConfig::default()
        };
        let assets = Arc::new(AssetRegistry::new());
        let audio = Arc::new(WorkerAudioSystem::spawn(assets.clone(), latency).unwrap());
        Setup {
            _dir: dir,
            config,
            assets,
            audio,
        }
    }

    impl Setup {
        fn host(&self) -> PreviewHost {
            PreviewHost::new(&self.config, self.assets.clone(), self.audio.clone())
        }
    }

    #[test]
    fn test_default_material_graph_is_written() {
        let s = setup();
        let entry = GraphEntry {
            asset: AssetId::new(),
            name: "Clay".to_string(),
            kind: GraphKind::Material {
                albedo: [0.75, 0.5, 0.25],
            },
        };

        assert!(matches!(s.host().open(&entry, false), Err(PreviewError::NoCache(_))));

        let mut graph = s.host().open(&entry, true).unwrap();
        assert_eq!(graph.editor.evaluate(), CompilationStatus::Success);
        assert_eq!(
            graph.material_overrides(),
            vec![(ALBEDO_COLOR.to_string(), MaterialProperty::Vec3([0.75, 0.5, 0.25]))]
        );

        let reopened = s.host().open(&entry, false).unwrap();
        assert_eq!(reopened.editor.node_count(), 2);
    }

    impl Setup {
        /// Cache a sound graph with one player on the output
        fn storm(&self) -> GraphEntry {
            let rain = self.assets.insert(Asset::Sound(SoundAsset {
                id: AssetId::new(),
                name: "rain".to_string(),
                path: PathBuf::from("rain.ogg"),
            }));
            let asset = AssetId::new();

            let mut editor = NodeEditor::new("Storm");
            let output = sound::build_default_graph(&mut editor);
            let player = sound::add_player(&mut editor, Some(rain)).unwrap();
            connect(&mut editor, player, 0, output, 0).unwrap();
            save_node_cache(&self.config.cache_dir, asset, &editor).unwrap();

            GraphEntry {
                asset,
                name: "Storm".to_string(),
                kind: GraphKind::Sound,
            }
        }
    }

    #[test]
    fn test_cached_sound_graph_spawns_on_worker() {
        let s = setup();
        let entry = s.storm();
        let mut graph = s.host().open(&entry, false).unwrap();
        assert_eq!(graph.editor.evaluate(), CompilationStatus::Success);
        assert!(s.audio.flush(Duration::from_secs(5)));

        assert_eq!(graph.alive_sounds(), 1);
        assert_eq!(s.audio.playing()[0].name, "rain");
        assert!(graph.material_overrides().is_empty());
    }

    #[test]
    fn test_back_to_back_passes_keep_one_sound() {
        let s = setup_with_latency(Duration::from_millis(50));
        let entry = s.storm();
        let mut graph = s.host().open(&entry, false).unwrap();

        graph.editor.try_evaluate().unwrap();
        graph.editor.try_evaluate().unwrap();
        assert!(s.audio.flush(Duration::from_secs(5)));

        assert_eq!(graph.alive_sounds(), 1);
        assert_eq!(s.audio.playing().len(), 1);
    }

    #[test]
    fn test_default_sound_graph_needs_input() {
        let s = setup();
        let entry = GraphEntry {
            asset: AssetId::new(),
            name: "Silence".to_string(),
            kind: GraphKind::Sound,
        };
        let mut graph = s.host().open(&entry, true).unwrap();
        assert!(matches!(
            graph.editor.try_evaluate(),
            Err(EvaluationError::RequiredInputUnlinked { .. })
        ));
    }
}
