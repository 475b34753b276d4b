// SPDX-License-Identifier: MIT OR Apache-2.0
//! Asset reference node shared by every graph domain.
//!
//! The referenced id lives in the node's extra data at
//! [`ASSET_ID_OFFSET`] and is edited at design time by an asset picker.

use crate::editor::NodeEditor;
use crate::evaluation::EvaluationError;
use crate::extra_data::{ExtraData, ExtraDataError};
use crate::host::AssetId;
use crate::node::{ExecutionType, Node, NodeId, NodeSpec};
use crate::pin::{PinSpec, PinType};

/// Display name of the asset node
pub const GET_ASSET_NAME: &str = "Get Asset";

/// Offset of the packed asset id in node extra data
pub const ASSET_ID_OFFSET: usize = 0;

/// Spec of the "Get Asset" node
pub fn get_asset_spec() -> NodeSpec {
    NodeSpec::new(GET_ASSET_NAME, ExecutionType::GetAsset)
        .with_color([200, 100, 150])
        .output(PinSpec::new("Asset", PinType::AssetHandle))
}

/// Add a "Get Asset" node referencing `asset`
pub fn add_get_asset(
    editor: &mut NodeEditor,
    asset: Option<AssetId>,
) -> Result<NodeId, ExtraDataError> {
    let mut node = Node::from_spec(&get_asset_spec());
    set_asset_id(&mut node, asset)?;
    Ok(editor.add_node(node))
}

/// Asset id referenced by a node
pub fn asset_id(node: &Node) -> Result<Option<AssetId>, ExtraDataError> {
    node.extra.read_asset_id(ASSET_ID_OFFSET)
}

/// Point a node at another asset, or clear it
pub fn set_asset_id(node: &mut Node, asset: Option<AssetId>) -> Result<(), ExtraDataError> {
    match asset {
        Some(id) => node.extra.write_asset_id(ASSET_ID_OFFSET, id),
        None => node.extra.write(ASSET_ID_OFFSET, 0u128),
    }
}

/// Extra data holding `asset` in the shared layout
pub fn asset_extra(asset: AssetId) -> Result<ExtraData, ExtraDataError> {
    let mut extra = ExtraData::new();
    extra.write_asset_id(ASSET_ID_OFFSET, asset)?;
    Ok(extra)
}

pub(crate) fn require_asset_id(node: &Node) -> Result<AssetId, EvaluationError> {
    asset_id(node)?.ok_or_else(|| EvaluationError::MissingInput {
        node: node.id,
        pin: "Asset".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_field_is_editable() {
        let mut editor = NodeEditor::new("assets");
        let first = AssetId::new();
        let id = add_get_asset(&mut editor, Some(first)).unwrap();

        let node = editor.find_node_mut(id).unwrap();
        assert_eq!(asset_id(node).unwrap(), Some(first));

        let second = AssetId::new();
        set_asset_id(node, Some(second)).unwrap();
        assert_eq!(require_asset_id(node).unwrap(), second);

        set_asset_id(node, None).unwrap();
        assert!(matches!(
            require_asset_id(node),
            Err(EvaluationError::MissingInput { .. })
        ));
    }
}
