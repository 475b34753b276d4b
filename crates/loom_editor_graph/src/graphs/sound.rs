// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sound graph: players, random pickers and mixers feeding a preview output.
//!
//! Values are sound asset ids. The output node turns whatever reaches it
//! into one [`SoundRequest`] per id; the audio system spawns them on its
//! own thread and reports each spawned sound back through
//! [`AliveSounds::recorder`].

use crate::editor::{NodeEditor, Visit};
use crate::evaluation::{Domain, DomainEvaluator, EvaluationError, ValueStack};
use crate::extra_data::ExtraDataError;
use crate::graphs::asset::{self, get_asset_spec};
use crate::host::{
    get_asset_as, AliveSounds, AssetId, AssetLookup, AudioSystem, PlayerId, SoundAsset,
    SoundRequest,
};
use crate::node::{ExecutionType, Node, NodeId, NodeLibrary, NodeSpec};
use crate::pin::{PinSpec, PinType};
use crate::settings::{RandomRange, RuntimeSettings};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Name of the sound sink node
pub const OUTPUT_NAME: &str = "Sound Output";

/// Input count of freshly created random and mixer nodes
pub const DEFAULT_INPUTS: usize = 2;

// ============================================================================
// Node specs
// ============================================================================

/// Sound sink
pub fn output_spec() -> NodeSpec {
    NodeSpec::new(OUTPUT_NAME, ExecutionType::SoundOutput)
        .with_color([80, 160, 200])
        .input(PinSpec::new("Sound", PinType::Audio))
        .undeletable()
}

/// Single sound asset, referenced from node extra data
pub fn player_spec() -> NodeSpec {
    NodeSpec::new("Sound Player", ExecutionType::SoundPlayer)
        .with_color([60, 180, 140])
        .output(PinSpec::new("Sound", PinType::Audio))
}

/// Picks one of its inputs per pass
pub fn random_sound_spec(inputs: usize) -> NodeSpec {
    with_sound_inputs(NodeSpec::new("Random Sound", ExecutionType::RandomSound), inputs)
        .with_color([200, 160, 60])
        .output(PinSpec::new("Sound", PinType::Audio))
}

/// Plays every input together
pub fn sound_mixer_spec(inputs: usize) -> NodeSpec {
    with_sound_inputs(NodeSpec::new("Sound Mixer", ExecutionType::SoundMixer), inputs)
        .with_color([160, 100, 200])
        .output(PinSpec::new("Sound", PinType::Audio))
}

fn with_sound_inputs(spec: NodeSpec, inputs: usize) -> NodeSpec {
    (1..=inputs).fold(spec, |spec, i| {
        spec.input(PinSpec::new(format!("Sound {i}"), PinType::Audio))
    })
}

/// Every node a sound graph offers
pub fn sound_library() -> NodeLibrary {
    let mut library = NodeLibrary::new();
    library.register(output_spec());
    library.register(player_spec());
    library.register(get_asset_spec());
    library.register(random_sound_spec(DEFAULT_INPUTS));
    library.register(sound_mixer_spec(DEFAULT_INPUTS));
    library
}

// ============================================================================
// Construction helpers
// ============================================================================

/// Add the sound sink
pub fn add_output(editor: &mut NodeEditor) -> NodeId {
    editor.add_node(Node::from_spec(&output_spec()))
}

/// Add a player referencing `sound`
pub fn add_player(
    editor: &mut NodeEditor,
    sound: Option<AssetId>,
) -> Result<NodeId, ExtraDataError> {
    let mut node = Node::from_spec(&player_spec());
    asset::set_asset_id(&mut node, sound)?;
    Ok(editor.add_node(node))
}

/// Add a random picker with `inputs` sound inputs
pub fn add_random_sound(editor: &mut NodeEditor, inputs: usize) -> NodeId {
    editor.add_node(Node::from_spec(&random_sound_spec(inputs)))
}

/// Add a mixer with `inputs` sound inputs
pub fn add_sound_mixer(editor: &mut NodeEditor, inputs: usize) -> NodeId {
    editor.add_node(Node::from_spec(&sound_mixer_spec(inputs)))
}

/// Create the graph a new sound asset starts with
pub fn build_default_graph(editor: &mut NodeEditor) -> NodeId {
    add_output(editor)
}

/// Locate the sink of a reloaded graph
pub fn find_output(editor: &NodeEditor) -> Option<NodeId> {
    editor
        .find_node_by_name(OUTPUT_NAME)
        .filter(|n| n.execution_type == ExecutionType::SoundOutput)
        .map(|n| n.id)
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluator spawning preview sounds for a sound graph
pub struct SoundEvaluator {
    output_node: NodeId,
    assets: Arc<dyn AssetLookup>,
    audio: Arc<dyn AudioSystem>,
    settings: RuntimeSettings,
    rng: StdRng,
    stack: ValueStack<AssetId>,
    alive: AliveSounds,
    preview: Uuid,
}

impl SoundEvaluator {
    /// Create an evaluator for the graph whose sink is `output_node`
    pub fn new(
        output_node: NodeId,
        assets: Arc<dyn AssetLookup>,
        audio: Arc<dyn AudioSystem>,
        settings: RuntimeSettings,
    ) -> Self {
        let rng = match settings.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            output_node,
            assets,
            audio,
            settings,
            rng,
            stack: ValueStack::new(),
            alive: AliveSounds::new(),
            preview: Uuid::new_v4(),
        }
    }

    /// Sounds spawned by the latest pass
    pub fn alive_sounds(&self) -> &AliveSounds {
        &self.alive
    }

    /// Preview group every spawned sound belongs to
    pub fn preview_id(&self) -> Uuid {
        self.preview
    }

    /// Settings in effect
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    fn evaluate_player(&mut self, node: &Node, visit: Visit) -> Result<(), EvaluationError> {
        let id = asset::require_asset_id(node)?;
        if get_asset_as::<SoundAsset>(self.assets.as_ref(), id).is_none() {
            tracing::warn!(asset = %id, node = ?node.id, "Sound asset not found, skipping");
            return Ok(());
        }
        self.stack.push(visit.feeds, node.id, id);
        Ok(())
    }

    fn evaluate_get_asset(&mut self, node: &Node, visit: Visit) -> Result<(), EvaluationError> {
        let id = asset::require_asset_id(node)?;
        self.stack.push(visit.feeds, node.id, id);
        Ok(())
    }

    fn evaluate_random(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
        visit: Visit,
    ) -> Result<(), EvaluationError> {
        let mut candidates = Vec::new();
        for entry in self.stack.take_inputs(editor, node).into_iter().flatten().flatten() {
            if source_is(editor, entry.source, &[ExecutionType::SoundPlayer]) {
                candidates.push(entry.value);
            } else {
                tracing::debug!(source = ?entry.source, "Random sound ignores non-player input");
            }
        }

        let range = match self.settings.random_range {
            RandomRange::ResolvedCandidates => node.inputs.len().min(candidates.len()),
            RandomRange::DeclaredInputs => node.inputs.len(),
        };
        if range == 0 {
            tracing::debug!(node = ?node.id, "Random sound has nothing to pick");
            return Ok(());
        }

        let index = self.rng.gen_range(0..range);
        match candidates.get(index) {
            Some(&id) => self.stack.push(visit.feeds, node.id, id),
            None => tracing::warn!(
                node = ?node.id,
                index,
                candidates = candidates.len(),
                "Random pick has no sound mapped"
            ),
        }
        Ok(())
    }

    fn evaluate_mixer(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
        visit: Visit,
    ) -> Result<(), EvaluationError> {
        let accepted = [ExecutionType::SoundPlayer, ExecutionType::RandomSound];
        for entry in self.stack.take_inputs(editor, node).into_iter().flatten().flatten() {
            if source_is(editor, entry.source, &accepted) {
                self.stack.push(visit.feeds, node.id, entry.value);
            } else {
                tracing::debug!(source = ?entry.source, "Mixer ignores unsupported input");
            }
        }
        Ok(())
    }

    fn evaluate_output(&mut self, node: &Node) -> Result<(), EvaluationError> {
        let requests: Vec<_> = self
            .stack
            .drain()
            .into_iter()
            .map(|entry| SoundRequest {
                asset: entry.value,
                player: PlayerId::new(),
                preview: self.preview,
            })
            .collect();

        if requests.is_empty() {
            return Err(EvaluationError::MissingValue {
                node: node.id,
                pin: "Sound".to_string(),
            });
        }

        tracing::debug!(preview = %self.preview, count = requests.len(), "Requesting sounds");
        self.audio.request_new_sounds(requests, self.alive.recorder());
        Ok(())
    }
}

impl DomainEvaluator for SoundEvaluator {
    fn domain(&self) -> Domain {
        Domain::Sound
    }

    fn output_node(&self) -> NodeId {
        self.output_node
    }

    fn required_inputs(&self) -> &'static [usize] {
        &[0]
    }

    fn reset(&mut self) {
        self.audio.stop_preview_sounds(self.preview);
        // Spawns still queued from the last pass report into the old list.
        let previous = std::mem::take(&mut self.alive);
        for sound in previous.drain() {
            self.audio.unload_sound(&sound);
        }
        self.stack.clear();
        if let Some(seed) = self.settings.random_seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
    }

    fn evaluate_node(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
        visit: Visit,
    ) -> Result<(), EvaluationError> {
        match node.execution_type {
            ExecutionType::SoundOutput => self.evaluate_output(node),
            ExecutionType::SoundPlayer => self.evaluate_player(node, visit),
            ExecutionType::GetAsset => self.evaluate_get_asset(node, visit),
            ExecutionType::RandomSound => self.evaluate_random(editor, node, visit),
            ExecutionType::SoundMixer => self.evaluate_mixer(editor, node, visit),
            _ => Err(EvaluationError::foreign(node, Domain::Sound)),
        }
    }
}

impl fmt::Debug for SoundEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundEvaluator")
            .field("output_node", &self.output_node)
            .field("settings", &self.settings)
            .field("preview", &self.preview)
            .field("alive", &self.alive.len())
            .finish_non_exhaustive()
    }
}

fn source_is(editor: &NodeEditor, source: NodeId, types: &[ExecutionType]) -> bool {
    editor
        .find_node(source)
        .is_some_and(|n| types.contains(&n.execution_type))
}
