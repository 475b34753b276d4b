// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation and execution.
//!
//! A pass walks the graph from the domain's output node, replays the walk
//! back to front and evaluates one node per visit. Nodes talk to each other
//! through the evaluator's [`ValueStack`]: a node pops the values its
//! linked inputs produced and pushes its own result for the input pin it
//! feeds. Replaying the walk this way is a postfix evaluation of the
//! dependency tree, so every consumer finds its inputs on top of the stack.

use crate::editor::{NodeEditor, Visit};
use crate::extra_data::ExtraDataError;
use crate::graphs::material::MaterialEvaluator;
use crate::graphs::sound::SoundEvaluator;
use crate::node::{ExecutionType, Node, NodeId};
use crate::pin::PinId;
use serde::{Deserialize, Serialize};

/// Outcome of an evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompilationStatus {
    /// Every node evaluated
    Success,
    /// The pass stopped early
    Failed,
}

/// Graph domain served by an evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Material graphs
    Material,
    /// Sound graphs
    Sound,
}

/// Error during evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// No runtime attached to the graph
    #[error("No runtime attached")]
    NoRuntime,

    /// Designated output node is not in the graph
    #[error("Output node not found: {0:?}")]
    OutputNodeMissing(NodeId),

    /// A required input of the output node has no link
    #[error("Required input '{pin}' is not linked")]
    RequiredInputUnlinked {
        /// Output node
        node: NodeId,
        /// Pin name
        pin: String,
    },

    /// Nothing is connected upstream of the output node
    #[error("Nothing is connected to the output node")]
    NothingConnected,

    /// Node visited by the walk is missing
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Node belongs to another domain
    #[error("{execution_type:?} node cannot run in a {domain:?} graph")]
    DomainMismatch {
        /// Offending node
        node: NodeId,
        /// Its type
        execution_type: ExecutionType,
        /// Domain of the active evaluator
        domain: Domain,
    },

    /// Node has no evaluation behaviour
    #[error("{execution_type:?} node has no evaluation behaviour")]
    UnsupportedNode {
        /// Offending node
        node: NodeId,
        /// Its type
        execution_type: ExecutionType,
    },

    /// Unlinked input without a usable constant
    #[error("Input '{pin}' has neither a link nor a value")]
    MissingInput {
        /// Node owning the pin
        node: NodeId,
        /// Pin name
        pin: String,
    },

    /// Linked input whose source produced nothing usable
    #[error("Input '{pin}' received no usable value")]
    MissingValue {
        /// Node owning the pin
        node: NodeId,
        /// Pin name
        pin: String,
    },

    /// Malformed extra data
    #[error(transparent)]
    ExtraData(#[from] ExtraDataError),
}

impl EvaluationError {
    /// Error for a node the evaluator of `domain` does not handle
    pub fn foreign(node: &Node, domain: Domain) -> Self {
        match node.execution_type.domain() {
            Some(_) => Self::DomainMismatch {
                node: node.id,
                execution_type: node.execution_type,
                domain,
            },
            None => Self::UnsupportedNode {
                node: node.id,
                execution_type: node.execution_type,
            },
        }
    }
}

/// One value on an evaluator stack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackEntry<T> {
    /// Input pin the value is meant for
    pub target: Option<PinId>,
    /// Node that produced the value
    pub source: NodeId,
    /// Payload
    pub value: T,
}

/// LIFO of values exchanged between nodes during a pass
#[derive(Debug, Clone)]
pub struct ValueStack<T> {
    entries: Vec<StackEntry<T>>,
}

impl<T> ValueStack<T> {
    /// Create an empty stack
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Push a value produced by `source` for the input pin `target`
    pub fn push(&mut self, target: Option<PinId>, source: NodeId, value: T) {
        self.entries.push(StackEntry {
            target,
            source,
            value,
        });
    }

    /// Pop the run of top entries addressed to `pin`, in push order
    pub fn pop_for(&mut self, pin: PinId) -> Vec<StackEntry<T>> {
        let split = self
            .entries
            .iter()
            .rposition(|e| e.target != Some(pin))
            .map_or(0, |i| i + 1);
        self.entries.split_off(split)
    }

    /// Pop the values for every input of `node`.
    ///
    /// Inputs are taken last to first and returned in pin order; an
    /// unlinked input yields `None`.
    pub fn take_inputs(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
    ) -> Vec<Option<Vec<StackEntry<T>>>> {
        let mut inputs: Vec<_> = node
            .inputs
            .iter()
            .rev()
            .map(|pin| editor.is_linked(pin.id).then(|| self.pop_for(pin.id)))
            .collect();
        inputs.reverse();
        inputs
    }

    /// Remove every entry
    pub fn drain(&mut self) -> Vec<StackEntry<T>> {
        std::mem::take(&mut self.entries)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the stack is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for ValueStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Visits of a pass in evaluation order, the output node last
pub fn evaluation_order(
    editor: &NodeEditor,
    output: NodeId,
) -> Result<Vec<Visit>, EvaluationError> {
    let mut recorded = Vec::new();
    editor.walk_from_start(output, |visit| recorded.push(visit));
    if recorded.len() <= 1 {
        return Err(EvaluationError::NothingConnected);
    }
    recorded.reverse();
    Ok(recorded)
}

/// Per-domain evaluation strategy
pub trait DomainEvaluator {
    /// Domain served
    fn domain(&self) -> Domain;

    /// Designated sink of the graph
    fn output_node(&self) -> NodeId;

    /// Input indices of the output node that must be linked
    fn required_inputs(&self) -> &'static [usize];

    /// Undo the effects of the previous pass and clear transient state
    fn reset(&mut self);

    /// Evaluate one visit of a node
    fn evaluate_node(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
        visit: Visit,
    ) -> Result<(), EvaluationError>;

    /// Run a full pass over `editor`
    fn evaluate_editor(&mut self, editor: &NodeEditor) -> Result<(), EvaluationError> {
        let output_id = self.output_node();
        let output = editor
            .find_node(output_id)
            .ok_or(EvaluationError::OutputNodeMissing(output_id))?;

        for &index in self.required_inputs() {
            let pin = output.input(index).ok_or_else(|| EvaluationError::MissingInput {
                node: output_id,
                pin: format!("#{index}"),
            })?;
            if !editor.is_linked(pin.id) {
                return Err(EvaluationError::RequiredInputUnlinked {
                    node: output_id,
                    pin: pin.name.clone(),
                });
            }
        }

        self.reset();

        let order = evaluation_order(editor, output_id)?;
        tracing::debug!(domain = ?self.domain(), visits = order.len(), "Evaluating graph");

        for visit in order {
            let node = editor
                .find_node(visit.node)
                .ok_or(EvaluationError::NodeNotFound(visit.node))?;
            self.evaluate_node(editor, node, visit)?;
        }

        tracing::info!(domain = ?self.domain(), graph = %editor.name, "Graph evaluated");
        Ok(())
    }
}

/// Evaluator attached to a graph
#[derive(Debug)]
pub enum Runtime {
    /// Writes material properties
    Material(MaterialEvaluator),
    /// Spawns preview sounds
    Sound(SoundEvaluator),
}

impl Runtime {
    /// Domain served
    pub fn domain(&self) -> Domain {
        match self {
            Self::Material(m) => m.domain(),
            Self::Sound(s) => s.domain(),
        }
    }

    /// Run a full pass over `editor`
    pub fn evaluate_editor(&mut self, editor: &NodeEditor) -> Result<(), EvaluationError> {
        match self {
            Self::Material(m) => m.evaluate_editor(editor),
            Self::Sound(s) => s.evaluate_editor(editor),
        }
    }

    /// The material evaluator, if that is what this is
    pub fn as_material(&self) -> Option<&MaterialEvaluator> {
        match self {
            Self::Material(m) => Some(m),
            Self::Sound(_) => None,
        }
    }

    /// The sound evaluator, if that is what this is
    pub fn as_sound(&self) -> Option<&SoundEvaluator> {
        match self {
            Self::Sound(s) => Some(s),
            Self::Material(_) => None,
        }
    }
}

impl From<MaterialEvaluator> for Runtime {
    fn from(evaluator: MaterialEvaluator) -> Self {
        Self::Material(evaluator)
    }
}

impl From<SoundEvaluator> for Runtime {
    fn from(evaluator: SoundEvaluator) -> Self {
        Self::Sound(evaluator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSpec;
    use crate::pin::{PinSpec, PinType};

    #[test]
    fn test_pop_for_takes_contiguous_run() {
        let (a, b) = (PinId::new(), PinId::new());
        let source = NodeId::new();
        let mut stack = ValueStack::new();
        stack.push(Some(a), source, 1);
        stack.push(Some(b), source, 2);
        stack.push(Some(b), source, 3);

        let values: Vec<_> = stack.pop_for(b).into_iter().map(|e| e.value).collect();
        assert_eq!(values, vec![2, 3]);
        assert!(stack.pop_for(b).is_empty());
        assert_eq!(stack.pop_for(a).len(), 1);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_take_inputs_in_pin_order() {
        let mut editor = NodeEditor::new("inputs");
        let consumer = Node::from_spec(
            &NodeSpec::new("Consumer", ExecutionType::None)
                .input(PinSpec::new("A", PinType::Float))
                .input(PinSpec::new("B", PinType::Float))
                .input(PinSpec::new("C", PinType::Float)),
        );
        let producer = Node::from_spec(
            &NodeSpec::new("Producer", ExecutionType::None)
                .output(PinSpec::new("Out", PinType::Float)),
        );
        let (pins, out) = (
            consumer.inputs.iter().map(|p| p.id).collect::<Vec<_>>(),
            producer.outputs[0].id,
        );
        editor.add_node(consumer.clone());
        editor.add_node(producer.clone());
        editor.create_link(out, pins[0]).unwrap();
        editor.create_link(out, pins[2]).unwrap();

        let mut stack = ValueStack::new();
        stack.push(None, producer.id, 99);
        stack.push(Some(pins[0]), producer.id, 10);
        stack.push(Some(pins[2]), producer.id, 30);

        let inputs = stack.take_inputs(&editor, &consumer);
        assert_eq!(inputs[0].as_ref().unwrap()[0].value, 10);
        assert!(inputs[1].is_none());
        assert_eq!(inputs[2].as_ref().unwrap()[0].value, 30);
        assert_eq!(stack.drain().len(), 1);
    }

    #[test]
    fn test_lone_output_has_no_order() {
        let mut editor = NodeEditor::new("lonely");
        let sink = NodeSpec::new("Out", ExecutionType::SoundOutput);
        let output = editor.add_node(Node::from_spec(&sink));
        assert_eq!(
            evaluation_order(&editor, output),
            Err(EvaluationError::NothingConnected)
        );
    }

    #[test]
    fn test_foreign_node_errors() {
        let sound = Node::from_spec(&NodeSpec::new("Player", ExecutionType::SoundPlayer));
        let inert = Node::from_spec(&NodeSpec::new("Inert", ExecutionType::None));

        assert!(matches!(
            EvaluationError::foreign(&sound, Domain::Material),
            EvaluationError::DomainMismatch { domain: Domain::Material, .. }
        ));
        assert!(matches!(
            EvaluationError::foreign(&inert, Domain::Sound),
            EvaluationError::UnsupportedNode { .. }
        ));
    }
}
