// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph container holding the nodes and links of one editable graph.

use crate::evaluation::{CompilationStatus, EvaluationError, Runtime};
use crate::link::{Link, LinkId};
use crate::node::{Node, NodeId};
use crate::pin::{Pin, PinId};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

/// One step of a dependency walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// Node being visited
    pub node: NodeId,
    /// Input pin of the downstream node this visit feeds; `None` for the root
    pub feeds: Option<PinId>,
}

/// A node feeding one of another node's inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    /// Upstream node
    pub node: NodeId,
    /// Link between the two
    pub link: LinkId,
    /// Output pin on the upstream node
    pub output: PinId,
    /// Input pin on the downstream node
    pub input: PinId,
}

/// Node editor graph: nodes keyed by id plus the links between their pins
pub struct NodeEditor {
    /// Graph name
    pub name: String,
    nodes: IndexMap<NodeId, Node>,
    links: Vec<Link>,
    runtime: Option<Runtime>,
}

impl NodeEditor {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            links: Vec::new(),
            runtime: None,
        }
    }

    /// Rebuild a graph from persisted nodes and links.
    ///
    /// Every link must resolve to pins of the given nodes, and no input pin
    /// may receive more than one link.
    pub fn from_parts(
        name: impl Into<String>,
        nodes: Vec<Node>,
        links: Vec<Link>,
    ) -> Result<Self, EditorError> {
        let mut editor = Self::new(name);
        for node in nodes {
            editor.add_node(node);
        }
        let mut linked_inputs = HashSet::new();
        for link in &links {
            if editor.find_pin(link.start_pin).is_none() || editor.find_pin(link.end_pin).is_none()
            {
                return Err(EditorError::DanglingLink(link.id));
            }
            if !linked_inputs.insert(link.end_pin) {
                return Err(EditorError::DuplicateInput(link.end_pin));
            }
        }
        editor.links = links;
        Ok(editor)
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every link touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, EditorError> {
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(EditorError::NodeNotFound(node_id))?;
        if !node.deletable {
            return Err(EditorError::NotDeletable(node_id));
        }

        let pins: Vec<PinId> = node.pins().map(|p| p.id).collect();
        self.links
            .retain(|l| !pins.contains(&l.start_pin) && !pins.contains(&l.end_pin));
        self.nodes
            .shift_remove(&node_id)
            .ok_or(EditorError::NodeNotFound(node_id))
    }

    /// Get a node by ID
    pub fn find_node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn find_node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// First node with the given display name
    pub fn find_node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name == name)
    }

    /// Get a pin by ID
    pub fn find_pin(&self, pin_id: PinId) -> Option<&Pin> {
        self.nodes.values().find_map(|n| n.pin(pin_id))
    }

    /// Get a mutable pin by ID
    pub fn find_pin_mut(&mut self, pin_id: PinId) -> Option<&mut Pin> {
        self.nodes.values_mut().find_map(|n| n.pin_mut(pin_id))
    }

    /// Node owning a pin
    pub fn find_node_by_pin(&self, pin_id: PinId) -> Option<&Node> {
        let pin = self.find_pin(pin_id)?;
        self.find_node(pin.node)
    }

    /// Get a link by ID
    pub fn find_link(&self, link_id: LinkId) -> Option<&Link> {
        self.links.iter().find(|l| l.id == link_id)
    }

    /// First link with `pin_id` as either endpoint
    pub fn find_link_by_pin(&self, pin_id: PinId) -> Option<&Link> {
        self.links.iter().find(|l| l.involves_pin(pin_id))
    }

    /// Check whether any link touches a pin
    pub fn is_linked(&self, pin_id: PinId) -> bool {
        self.find_link_by_pin(pin_id).is_some()
    }

    /// Nodes feeding the inputs of `node`, in input-pin order
    pub fn upstream(&self, node: &Node) -> Vec<Neighbor> {
        node.inputs
            .iter()
            .filter_map(|input| {
                let link = self.links.iter().find(|l| l.end_pin == input.id)?;
                let source = self.find_pin(link.start_pin)?;
                Some(Neighbor {
                    node: source.node,
                    link: link.id,
                    output: link.start_pin,
                    input: input.id,
                })
            })
            .collect()
    }

    /// Ids of the nodes feeding the inputs of `node`, in input-pin order
    pub fn find_neighbors(&self, node: &Node) -> Vec<NodeId> {
        self.upstream(node).into_iter().map(|n| n.node).collect()
    }

    /// Links leaving any output pin of `node`
    pub fn downstream_links<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Link> + 'a {
        self.links
            .iter()
            .filter(move |l| node.outputs.iter().any(|p| p.id == l.start_pin))
    }

    /// Connect an output pin to an input pin.
    ///
    /// Pin types are not compared; evaluators decide what they accept.
    pub fn create_link(&mut self, start_pin: PinId, end_pin: PinId) -> Result<LinkId, LinkError> {
        let start = self
            .find_pin(start_pin)
            .ok_or(LinkError::PinNotFound(start_pin))?;
        let end = self
            .find_pin(end_pin)
            .ok_or(LinkError::PinNotFound(end_pin))?;

        if !start.is_output() || !end.is_input() {
            return Err(LinkError::WrongDirection);
        }
        if start.node == end.node {
            return Err(LinkError::SelfLoop);
        }
        if self.links.iter().any(|l| l.end_pin == end_pin) {
            return Err(LinkError::InputAlreadyLinked(end_pin));
        }

        let link = Link::new(start_pin, end_pin);
        let id = link.id;
        self.links.push(link);
        Ok(id)
    }

    /// Remove a link
    pub fn remove_link(&mut self, link_id: LinkId) -> Option<Link> {
        let index = self.links.iter().position(|l| l.id == link_id)?;
        Some(self.links.remove(index))
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all links
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Depth-first walk over the "depends on" relation starting at `root`.
    ///
    /// Pre-order: `root` is reported first. A node reachable through several
    /// paths is reported once per path. Replaying the reported sequence
    /// back to front puts every node before the nodes that consume it.
    /// Cycles are not detected and make the walk unbounded.
    pub fn walk_from_start(&self, root: NodeId, mut visit: impl FnMut(Visit)) {
        let mut stack = vec![Visit {
            node: root,
            feeds: None,
        }];

        while let Some(current) = stack.pop() {
            visit(current);
            let Some(node) = self.find_node(current.node) else {
                continue;
            };
            for neighbor in self.upstream(node) {
                stack.push(Visit {
                    node: neighbor.node,
                    feeds: Some(neighbor.input),
                });
            }
        }
    }

    /// [`NodeEditor::walk_from_start`] reporting node ids only
    pub fn traverse_from_start(&self, root: NodeId, mut visit: impl FnMut(NodeId)) {
        self.walk_from_start(root, |v| visit(v.node));
    }

    /// Attach an evaluator, returning the previous one
    pub fn set_runtime(&mut self, runtime: impl Into<Runtime>) -> Option<Runtime> {
        self.runtime.replace(runtime.into())
    }

    /// Detach the evaluator
    pub fn take_runtime(&mut self) -> Option<Runtime> {
        self.runtime.take()
    }

    /// Attached evaluator
    pub fn runtime(&self) -> Option<&Runtime> {
        self.runtime.as_ref()
    }

    /// Attached evaluator, mutably
    pub fn runtime_mut(&mut self) -> Option<&mut Runtime> {
        self.runtime.as_mut()
    }

    /// Run one evaluation pass with the attached runtime
    pub fn evaluate(&mut self) -> CompilationStatus {
        match self.try_evaluate() {
            Ok(()) => CompilationStatus::Success,
            Err(err) => {
                tracing::warn!(graph = %self.name, "Evaluation failed: {err}");
                CompilationStatus::Failed
            }
        }
    }

    /// Like [`NodeEditor::evaluate`] but keeps the failure reason
    pub fn try_evaluate(&mut self) -> Result<(), EvaluationError> {
        let mut runtime = self.runtime.take().ok_or(EvaluationError::NoRuntime)?;
        let result = runtime.evaluate_editor(self);
        self.runtime = Some(runtime);
        result
    }
}

impl Default for NodeEditor {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl fmt::Debug for NodeEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeEditor")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("runtime", &self.runtime.as_ref().map(Runtime::domain))
            .finish()
    }
}

/// Error when creating a link
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// Pin not found
    #[error("Pin not found: {0:?}")]
    PinNotFound(PinId),

    /// Start must be an output and end an input
    #[error("Links must run from an output pin to an input pin")]
    WrongDirection,

    /// Both pins on the same node
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Input pin already has a link
    #[error("Pin already linked: {0:?}")]
    InputAlreadyLinked(PinId),
}

/// Error when editing or rebuilding the graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Sink nodes are structurally required
    #[error("Node cannot be deleted: {0:?}")]
    NotDeletable(NodeId),

    /// Link endpoint does not resolve
    #[error("Link references a missing pin: {0:?}")]
    DanglingLink(LinkId),

    /// Input pin is the end of more than one link
    #[error("Input pin has more than one link: {0:?}")]
    DuplicateInput(PinId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ExecutionType, NodeSpec};
    use crate::pin::{PinSpec, PinType};

    fn node(inputs: usize, outputs: usize) -> Node {
        let mut spec = NodeSpec::new("Node", ExecutionType::None);
        for i in 0..inputs {
            spec = spec.input(PinSpec::new(format!("In {i}"), PinType::Float));
        }
        for i in 0..outputs {
            spec = spec.output(PinSpec::new(format!("Out {i}"), PinType::Float));
        }
        Node::from_spec(&spec)
    }

    fn link(
        editor: &mut NodeEditor,
        from: NodeId,
        output: usize,
        to: NodeId,
        input: usize,
    ) -> LinkId {
        let start = editor.find_node(from).unwrap().outputs[output].id;
        let end = editor.find_node(to).unwrap().inputs[input].id;
        editor.create_link(start, end).unwrap()
    }

    /// root <- a <- c, root <- b <- d, b <- e
    fn tree() -> (NodeEditor, [NodeId; 6]) {
        let mut editor = NodeEditor::new("tree");
        let root = editor.add_node(node(2, 0));
        let a = editor.add_node(node(1, 1));
        let b = editor.add_node(node(2, 1));
        let c = editor.add_node(node(0, 1));
        let d = editor.add_node(node(0, 1));
        let e = editor.add_node(node(0, 1));
        link(&mut editor, a, 0, root, 0);
        link(&mut editor, b, 0, root, 1);
        link(&mut editor, c, 0, a, 0);
        link(&mut editor, d, 0, b, 0);
        link(&mut editor, e, 0, b, 1);
        (editor, [root, a, b, c, d, e])
    }

    fn replayed(editor: &NodeEditor, root: NodeId) -> Vec<Visit> {
        let mut recorded = Vec::new();
        editor.walk_from_start(root, |v| recorded.push(v));
        recorded.reverse();
        recorded
    }

    #[test]
    fn test_lookups() {
        let (editor, [root, a, ..]) = tree();
        let a_out = editor.find_node(a).unwrap().outputs[0].id;
        let root_in = editor.find_node(root).unwrap().inputs[0].id;

        assert_eq!(editor.find_node_by_pin(a_out).unwrap().id, a);
        assert_eq!(editor.find_pin(root_in).unwrap().name, "In 0");
        assert!(editor.is_linked(a_out));
        let link = editor.find_link_by_pin(root_in).unwrap();
        assert_eq!(link.other_end(root_in), Some(a_out));
        assert_eq!(editor.find_link(link.id), Some(link));
        assert_eq!(editor.find_node_by_name("Node").map(|n| n.name.as_str()), Some("Node"));
        assert!(editor.find_node(NodeId::new()).is_none());
    }

    #[test]
    fn test_neighbors_follow_input_order() {
        let (editor, [root, a, b, c, ..]) = tree();
        let root_node = editor.find_node(root).unwrap();
        assert_eq!(editor.find_neighbors(root_node), vec![a, b]);

        let c_node = editor.find_node(c).unwrap();
        assert!(editor.find_neighbors(c_node).is_empty());

        let a_node = editor.find_node(a).unwrap();
        let out: Vec<_> = editor.downstream_links(a_node).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].end_pin, root_node.inputs[0].id);
    }

    #[test]
    fn test_traversal_is_preorder_from_root() {
        let (editor, [root, a, b, c, d, e]) = tree();
        let mut order = Vec::new();
        editor.traverse_from_start(root, |id| order.push(id));

        assert_eq!(order, vec![root, b, e, d, a, c]);
    }

    #[test]
    fn test_replay_puts_dependencies_first() {
        let (editor, [root, ..]) = tree();
        let order = replayed(&editor, root);
        assert_eq!(order.last().unwrap().node, root);

        for (position, visit) in order.iter().enumerate() {
            let node = editor.find_node(visit.node).unwrap();
            for dependency in editor.find_neighbors(node) {
                assert!(order[..position].iter().any(|v| v.node == dependency));
            }
        }
    }

    #[test]
    fn test_diamond_is_visited_per_path() {
        let mut editor = NodeEditor::new("diamond");
        let root = editor.add_node(node(2, 0));
        let left = editor.add_node(node(1, 1));
        let right = editor.add_node(node(1, 1));
        let shared = editor.add_node(node(0, 2));
        link(&mut editor, left, 0, root, 0);
        link(&mut editor, right, 0, root, 1);
        link(&mut editor, shared, 0, left, 0);
        link(&mut editor, shared, 1, right, 0);

        let order = replayed(&editor, root);
        let shared_visits: Vec<_> = order.iter().filter(|v| v.node == shared).collect();
        assert_eq!(shared_visits.len(), 2);

        let left_in = editor.find_node(left).unwrap().inputs[0].id;
        let right_in = editor.find_node(right).unwrap().inputs[0].id;
        let fed: Vec<_> = shared_visits.iter().filter_map(|v| v.feeds).collect();
        assert!(fed.contains(&left_in) && fed.contains(&right_in));
    }

    #[test]
    fn test_link_validation() {
        let mut editor = NodeEditor::new("links");
        let sink = editor.add_node(node(1, 0));
        let source = editor.add_node(node(0, 1));
        let other = editor.add_node(node(1, 1));
        let sink_in = editor.find_node(sink).unwrap().inputs[0].id;
        let source_out = editor.find_node(source).unwrap().outputs[0].id;
        let other_in = editor.find_node(other).unwrap().inputs[0].id;
        let other_out = editor.find_node(other).unwrap().outputs[0].id;

        assert_eq!(editor.create_link(sink_in, source_out), Err(LinkError::WrongDirection));
        assert_eq!(editor.create_link(other_out, other_in), Err(LinkError::SelfLoop));
        assert!(matches!(
            editor.create_link(PinId::new(), sink_in),
            Err(LinkError::PinNotFound(_))
        ));

        editor.create_link(source_out, sink_in).unwrap();
        assert_eq!(
            editor.create_link(other_out, sink_in),
            Err(LinkError::InputAlreadyLinked(sink_in))
        );
        // outputs fan out freely
        editor.create_link(source_out, other_in).unwrap();
        assert_eq!(editor.link_count(), 2);
    }

    #[test]
    fn test_remove_node_drops_links() {
        let (mut editor, [root, a, _, c, ..]) = tree();
        editor.remove_node(a).unwrap();

        assert!(editor.find_node(a).is_none());
        assert_eq!(editor.link_count(), 3);
        let root_node = editor.find_node(root).unwrap();
        assert!(!editor.is_linked(root_node.inputs[0].id));
        let c_out = editor.find_node(c).unwrap().outputs[0].id;
        assert!(!editor.is_linked(c_out));
    }

    #[test]
    fn test_sink_is_not_deletable() {
        let mut editor = NodeEditor::new("sink");
        let spec = NodeSpec::new("Output", ExecutionType::MaterialOutput).undeletable();
        let sink = editor.add_node(Node::from_spec(&spec));

        assert_eq!(editor.remove_node(sink), Err(EditorError::NotDeletable(sink)));
        assert_eq!(editor.node_count(), 1);

        let missing = NodeId::new();
        assert_eq!(editor.remove_node(missing), Err(EditorError::NodeNotFound(missing)));
    }

    #[test]
    fn test_from_parts_rejects_dangling_links() {
        let (editor, _) = tree();
        let nodes: Vec<Node> = editor.nodes().cloned().collect();
        let mut links = editor.links().to_vec();

        let rebuilt = NodeEditor::from_parts("copy", nodes.clone(), links.clone()).unwrap();
        assert_eq!(rebuilt.link_count(), 5);

        let stray = Link::new(PinId::new(), links[0].end_pin);
        links.push(stray);
        assert_eq!(
            NodeEditor::from_parts("copy", nodes, links).unwrap_err(),
            EditorError::DanglingLink(stray.id)
        );
    }

    #[test]
    fn test_from_parts_rejects_second_link_into_input() {
        let (editor, [.., e]) = tree();
        let nodes: Vec<Node> = editor.nodes().cloned().collect();
        let mut links = editor.links().to_vec();

        let taken = links[0].end_pin;
        let e_out = editor.find_node(e).unwrap().outputs[0].id;
        links.push(Link::new(e_out, taken));
        assert_eq!(
            NodeEditor::from_parts("copy", nodes, links).unwrap_err(),
            EditorError::DuplicateInput(taken)
        );
    }

    #[test]
    fn test_evaluate_without_runtime_fails() {
        let (mut editor, _) = tree();
        assert_eq!(editor.evaluate(), CompilationStatus::Failed);
        assert!(matches!(editor.try_evaluate(), Err(EvaluationError::NoRuntime)));
    }
}
