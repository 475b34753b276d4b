// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::evaluation::Domain;
use crate::extra_data::ExtraData;
use crate::pin::{Pin, PinId, PinKind, PinSpec};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Closed set of node behaviours.
///
/// The tag decides which evaluation routine runs for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecutionType {
    /// No behaviour attached
    #[default]
    None,
    /// Material sink
    MaterialOutput,
    /// Texture sampler
    Sampler2D,
    /// Constant color
    ColorPicker,
    /// Asset reference
    GetAsset,
    /// Color interpolation
    MaterialMixColors,
    /// Component-wise addition
    Add,
    /// Component-wise subtraction
    Subtract,
    /// Component-wise multiplication
    Multiply,
    /// Component-wise division
    Divide,
    /// Sound sink
    SoundOutput,
    /// Single sound asset
    SoundPlayer,
    /// Uniform pick among inputs
    RandomSound,
    /// Forwards every input
    SoundMixer,
}

impl ExecutionType {
    /// Domain this node type belongs to; `None` for shared or inert types
    pub fn domain(&self) -> Option<Domain> {
        match self {
            Self::MaterialOutput
            | Self::Sampler2D
            | Self::ColorPicker
            | Self::MaterialMixColors
            | Self::Add
            | Self::Subtract
            | Self::Multiply
            | Self::Divide => Some(Domain::Material),
            Self::SoundOutput | Self::SoundPlayer | Self::RandomSound | Self::SoundMixer => {
                Some(Domain::Sound)
            }
            Self::None | Self::GetAsset => None,
        }
    }

    /// Whether this is a domain sink
    pub fn is_output(&self) -> bool {
        matches!(self, Self::MaterialOutput | Self::SoundOutput)
    }
}

/// Value object a node is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Display name
    pub name: String,
    /// Behaviour tag
    pub execution_type: ExecutionType,
    /// Header color (presentation only)
    pub color: [u8; 3],
    /// Input pin layout
    pub inputs: Vec<PinSpec>,
    /// Output pin layout
    pub outputs: Vec<PinSpec>,
    /// Whether users may delete the node
    pub deletable: bool,
    /// Initial node payload
    pub extra: ExtraData,
}

impl NodeSpec {
    /// Start a deletable spec with no pins
    pub fn new(name: impl Into<String>, execution_type: ExecutionType) -> Self {
        Self {
            name: name.into(),
            execution_type,
            color: [128, 128, 128],
            inputs: Vec::new(),
            outputs: Vec::new(),
            deletable: true,
            extra: ExtraData::new(),
        }
    }

    /// Set the header color
    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    /// Append an input pin
    pub fn input(mut self, pin: PinSpec) -> Self {
        self.inputs.push(pin);
        self
    }

    /// Append an output pin
    pub fn output(mut self, pin: PinSpec) -> Self {
        self.outputs.push(pin);
        self
    }

    /// Mark as a structurally required sink
    pub fn undeletable(mut self) -> Self {
        self.deletable = false;
        self
    }

    /// Set the initial node payload
    pub fn with_extra(mut self, extra: ExtraData) -> Self {
        self.extra = extra;
        self
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Behaviour tag
    pub execution_type: ExecutionType,
    /// Display name
    pub name: String,
    /// Header color (presentation only)
    pub color: [u8; 3],
    /// Input pins
    pub inputs: Vec<Pin>,
    /// Output pins
    pub outputs: Vec<Pin>,
    /// Whether users may delete the node
    pub deletable: bool,
    /// Node-level constants
    pub extra: ExtraData,
}

impl Node {
    /// Create a new node from a spec
    pub fn from_spec(spec: &NodeSpec) -> Self {
        let id = NodeId::new();
        Self {
            id,
            execution_type: spec.execution_type,
            name: spec.name.clone(),
            color: spec.color,
            inputs: spec
                .inputs
                .iter()
                .map(|p| p.build(id, PinKind::Input))
                .collect(),
            outputs: spec
                .outputs
                .iter()
                .map(|p| p.build(id, PinKind::Output))
                .collect(),
            deletable: spec.deletable,
            extra: spec.extra,
        }
    }

    /// Get an input pin by index
    pub fn input(&self, index: usize) -> Option<&Pin> {
        self.inputs.get(index)
    }

    /// Get an output pin by index
    pub fn output(&self, index: usize) -> Option<&Pin> {
        self.outputs.get(index)
    }

    /// Get a pin by ID
    pub fn pin(&self, pin_id: PinId) -> Option<&Pin> {
        self.pins().find(|p| p.id == pin_id)
    }

    /// Get a mutable pin by ID
    pub fn pin_mut(&mut self, pin_id: PinId) -> Option<&mut Pin> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|p| p.id == pin_id)
    }

    /// Position of an input pin
    pub fn input_index(&self, pin_id: PinId) -> Option<usize> {
        self.inputs.iter().position(|p| p.id == pin_id)
    }

    /// Get all pins
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.inputs.iter().chain(self.outputs.iter())
    }
}

/// Catalogue of node specs available to one graph domain
#[derive(Debug, Clone, Default)]
pub struct NodeLibrary {
    specs: indexmap::IndexMap<ExecutionType, NodeSpec>,
}

impl NodeLibrary {
    /// Create a new empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node spec, replacing any previous one of the same type
    pub fn register(&mut self, spec: NodeSpec) {
        self.specs.insert(spec.execution_type, spec);
    }

    /// Get a spec by type
    pub fn get(&self, execution_type: ExecutionType) -> Option<&NodeSpec> {
        self.specs.get(&execution_type)
    }

    /// Get all registered specs
    pub fn specs(&self) -> impl Iterator<Item = &NodeSpec> {
        self.specs.values()
    }

    /// Create a node of the given type
    pub fn create_node(&self, execution_type: ExecutionType) -> Option<Node> {
        self.get(execution_type).map(Node::from_spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::PinType;

    fn sampler_like() -> NodeSpec {
        NodeSpec::new("Sampler", ExecutionType::Sampler2D)
            .input(PinSpec::new("Texture", PinType::AssetHandle))
            .output(PinSpec::new("RGBA", PinType::Rgba))
            .output(PinSpec::new("R", PinType::Red))
    }

    #[test]
    fn test_from_spec_assigns_back_references() {
        let node = Node::from_spec(&sampler_like());
        assert_eq!(node.inputs.len(), 1);
        assert_eq!(node.outputs.len(), 2);
        assert!(node.pins().all(|p| p.node == node.id));
        assert!(node.inputs.iter().all(Pin::is_input));
        assert!(node.outputs.iter().all(Pin::is_output));
        assert!(node.deletable);
    }

    #[test]
    fn test_pin_lookup() {
        let node = Node::from_spec(&sampler_like());
        let red = node.output(1).unwrap().id;
        assert_eq!(node.pin(red).unwrap().name, "R");
        assert_eq!(node.input_index(red), None);
        assert_eq!(node.input_index(node.inputs[0].id), Some(0));
    }

    #[test]
    fn test_library_creates_fresh_nodes() {
        let mut library = NodeLibrary::new();
        library.register(sampler_like());

        let a = library.create_node(ExecutionType::Sampler2D).unwrap();
        let b = library.create_node(ExecutionType::Sampler2D).unwrap();
        assert_ne!(a.id, b.id);
        assert!(library.create_node(ExecutionType::SoundMixer).is_none());
    }

    #[test]
    fn test_domains() {
        assert_eq!(ExecutionType::Divide.domain(), Some(Domain::Material));
        assert_eq!(ExecutionType::RandomSound.domain(), Some(Domain::Sound));
        assert_eq!(ExecutionType::GetAsset.domain(), None);
        assert!(ExecutionType::SoundOutput.is_output());
        assert!(!ExecutionType::SoundPlayer.is_output());
    }
}
