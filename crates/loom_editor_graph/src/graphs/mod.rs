// SPDX-License-Identifier: MIT OR Apache-2.0
//! Domain node libraries built on the core framework.

pub mod asset;
pub mod material;
pub mod sound;

use crate::editor::{LinkError, NodeEditor};
use crate::extra_data::ExtraDataError;
use crate::link::LinkId;
use crate::node::NodeId;

/// Error while assembling a graph programmatically
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Link rejected by the container
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Payload did not fit
    #[error(transparent)]
    ExtraData(#[from] ExtraDataError),

    /// Pin index does not exist on the node
    #[error("Node {node:?} has no pin #{index}")]
    MissingPin {
        /// Node addressed
        node: NodeId,
        /// Pin index
        index: usize,
    },
}

/// Link output `output` of `from` to input `input` of `to`
pub fn connect(
    editor: &mut NodeEditor,
    from: NodeId,
    output: usize,
    to: NodeId,
    input: usize,
) -> Result<LinkId, BuildError> {
    let start = editor
        .find_node(from)
        .and_then(|n| n.output(output))
        .ok_or(BuildError::MissingPin {
            node: from,
            index: output,
        })?
        .id;
    let end = editor
        .find_node(to)
        .and_then(|n| n.input(input))
        .ok_or(BuildError::MissingPin { node: to, index: input })?
        .id;
    Ok(editor.create_link(start, end)?)
}
