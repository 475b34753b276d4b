// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material graph: nodes that feed textures and colors into a material.
//!
//! Every value travelling between material nodes is a [`MaterialValue`]:
//! the output slot it is meant for, a color and an optional texture id. A
//! producer wired straight into the output node tags its value with that
//! input's [`MaterialSlot`]; values consumed by intermediate nodes carry no
//! slot.

use crate::editor::{NodeEditor, Visit};
use crate::evaluation::{Domain, DomainEvaluator, EvaluationError, StackEntry, ValueStack};
use crate::extra_data::{ExtraData, ExtraDataError};
use crate::graphs::asset::{self, get_asset_spec, ASSET_ID_OFFSET};
use crate::graphs::{connect, BuildError};
use crate::host::material::ALBEDO_COLOR;
use crate::host::{
    get_asset_as, AssetId, AssetLookup, MaterialProperty, MaterialTarget, SharedMaterial, Texture,
};
use crate::node::{ExecutionType, Node, NodeId, NodeLibrary, NodeSpec};
use crate::pin::{Pin, PinSpec, PinType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name of the material sink node
pub const OUTPUT_NAME: &str = "Material Output";

/// Offset of the picked RGBA in a color picker's extra data
pub const PICKED_COLOR_OFFSET: usize = 0;

/// Blend factor of a fresh "Mix Colors" node
pub const DEFAULT_MIX_FACTOR: f32 = 0.5;

/// Input slot of the material output node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialSlot {
    /// Base color or albedo map
    Albedo,
    /// Normal map
    Normal,
    /// Metallic map
    Metallic,
    /// Roughness map
    Roughness,
    /// Emissive color
    Emission,
}

impl MaterialSlot {
    /// Slots in output-pin order
    pub const ALL: [Self; 5] = [
        Self::Albedo,
        Self::Normal,
        Self::Metallic,
        Self::Roughness,
        Self::Emission,
    ];

    /// Slot fed by the output node's input at `index`
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Input index on the output node
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Value exchanged between material nodes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MaterialValue {
    /// Output slot, when produced for the output node
    pub slot: Option<MaterialSlot>,
    /// RGB color
    pub color: [f32; 3],
    /// Texture asset
    pub texture: Option<AssetId>,
}

impl MaterialValue {
    /// A color-only value
    pub fn from_color(slot: Option<MaterialSlot>, color: [f32; 3]) -> Self {
        Self {
            slot,
            color,
            texture: None,
        }
    }

    /// A texture-only value
    pub fn from_texture(slot: Option<MaterialSlot>, texture: AssetId) -> Self {
        Self {
            slot,
            color: [0.0; 3],
            texture: Some(texture),
        }
    }

    /// Whether any color channel is non-zero
    pub fn has_color(&self) -> bool {
        self.color.iter().any(|c| *c != 0.0)
    }

    /// The color, unless this value only carries a texture
    pub fn color_operand(&self) -> Option<[f32; 3]> {
        (self.has_color() || self.texture.is_none()).then_some(self.color)
    }
}

/// Component-wise arithmetic node operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    /// a + b
    Add,
    /// a - b
    Subtract,
    /// a * b
    Multiply,
    /// a / b, zero when b is zero
    Divide,
}

impl ArithmeticOp {
    /// Every operation
    pub const ALL: [Self; 4] = [Self::Add, Self::Subtract, Self::Multiply, Self::Divide];

    /// Behaviour tag of the node
    pub fn execution_type(self) -> ExecutionType {
        match self {
            Self::Add => ExecutionType::Add,
            Self::Subtract => ExecutionType::Subtract,
            Self::Multiply => ExecutionType::Multiply,
            Self::Divide => ExecutionType::Divide,
        }
    }

    /// Node display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
        }
    }

    /// Apply to one channel
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide if b == 0.0 => 0.0,
            Self::Divide => a / b,
        }
    }

    /// Apply channel by channel
    pub fn apply_rgb(self, a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        std::array::from_fn(|i| self.apply(a[i], b[i]))
    }
}

// ============================================================================
// Node specs
// ============================================================================

/// Material sink with one input per [`MaterialSlot`]
pub fn output_spec() -> NodeSpec {
    NodeSpec::new(OUTPUT_NAME, ExecutionType::MaterialOutput)
        .with_color([100, 180, 100])
        .input(PinSpec::new("Albedo", PinType::Rgba))
        .input(PinSpec::new("Normal", PinType::Rgba))
        .input(PinSpec::new("Metallic", PinType::Red))
        .input(PinSpec::new("Roughness", PinType::Red))
        .input(PinSpec::new("Emission", PinType::Color))
        .undeletable()
}

/// Texture sampler; the texture comes from a link or the pin's own asset id
pub fn sampler_2d_spec() -> NodeSpec {
    NodeSpec::new("Sampler 2D", ExecutionType::Sampler2D)
        .with_color([180, 120, 60])
        .input(PinSpec::new("Texture", PinType::AssetHandle))
        .output(PinSpec::new("RGBA", PinType::Rgba))
        .output(PinSpec::new("R", PinType::Red))
        .output(PinSpec::new("G", PinType::Green))
        .output(PinSpec::new("B", PinType::Blue))
        .output(PinSpec::new("A", PinType::Alpha))
}

/// Constant color
pub fn color_picker_spec() -> NodeSpec {
    NodeSpec::new("Color Picker", ExecutionType::ColorPicker)
        .with_color([200, 80, 80])
        .output(PinSpec::new("Color", PinType::Color))
}

/// Linear blend of two colors
pub fn mix_colors_spec() -> NodeSpec {
    let factor = ExtraData::new().with(0, DEFAULT_MIX_FACTOR).unwrap_or_default();
    NodeSpec::new("Mix Colors", ExecutionType::MaterialMixColors)
        .with_color([150, 100, 200])
        .input(PinSpec::new("A", PinType::Color))
        .input(PinSpec::new("B", PinType::Color))
        .input(PinSpec::new("Factor", PinType::Float).with_extra(factor))
        .output(PinSpec::new("Color", PinType::Color))
}

/// Component-wise arithmetic
pub fn arithmetic_spec(op: ArithmeticOp) -> NodeSpec {
    NodeSpec::new(op.name(), op.execution_type())
        .with_color([100, 150, 200])
        .input(PinSpec::new("A", PinType::Float))
        .input(PinSpec::new("B", PinType::Float))
        .output(PinSpec::new("Result", PinType::Color))
}

/// Every node a material graph offers
pub fn material_library() -> NodeLibrary {
    let mut library = NodeLibrary::new();
    library.register(output_spec());
    library.register(sampler_2d_spec());
    library.register(color_picker_spec());
    library.register(get_asset_spec());
    library.register(mix_colors_spec());
    for op in ArithmeticOp::ALL {
        library.register(arithmetic_spec(op));
    }
    library
}

// ============================================================================
// Construction helpers
// ============================================================================

/// Add the material sink
pub fn add_output(editor: &mut NodeEditor) -> NodeId {
    editor.add_node(Node::from_spec(&output_spec()))
}

/// Add a sampler, optionally pointing its texture pin at `texture`
pub fn add_sampler_2d(
    editor: &mut NodeEditor,
    texture: Option<AssetId>,
) -> Result<NodeId, ExtraDataError> {
    let mut node = Node::from_spec(&sampler_2d_spec());
    set_sampler_texture(&mut node, texture)?;
    Ok(editor.add_node(node))
}

/// Add a color picker holding `rgba`
pub fn add_color_picker(editor: &mut NodeEditor, rgba: [f32; 4]) -> Result<NodeId, ExtraDataError> {
    let mut node = Node::from_spec(&color_picker_spec());
    set_picked_color(&mut node, rgba)?;
    Ok(editor.add_node(node))
}

/// Add a "Mix Colors" node
pub fn add_mix_colors(editor: &mut NodeEditor) -> NodeId {
    editor.add_node(Node::from_spec(&mix_colors_spec()))
}

/// Add an arithmetic node
pub fn add_arithmetic(editor: &mut NodeEditor, op: ArithmeticOp) -> NodeId {
    editor.add_node(Node::from_spec(&arithmetic_spec(op)))
}

/// Color stored in a color picker
pub fn picked_color(node: &Node) -> Result<[f32; 4], ExtraDataError> {
    node.extra.read(PICKED_COLOR_OFFSET)
}

/// Replace the color stored in a color picker
pub fn set_picked_color(node: &mut Node, rgba: [f32; 4]) -> Result<(), ExtraDataError> {
    node.extra.write(PICKED_COLOR_OFFSET, rgba)
}

/// Point a sampler's unlinked texture pin at `texture`
pub fn set_sampler_texture(
    node: &mut Node,
    texture: Option<AssetId>,
) -> Result<(), ExtraDataError> {
    let Some(pin) = node.inputs.first_mut() else {
        return Ok(());
    };
    match texture {
        Some(id) => pin.extra.write_asset_id(ASSET_ID_OFFSET, id),
        None => pin.extra.write(ASSET_ID_OFFSET, 0u128),
    }
}

/// Create the sink plus a color picker seeded from the material's albedo
pub fn build_default_graph(
    editor: &mut NodeEditor,
    material: &dyn MaterialTarget,
) -> Result<NodeId, BuildError> {
    let albedo = match material.get(ALBEDO_COLOR) {
        Some(MaterialProperty::Vec3([r, g, b])) => [r, g, b, 1.0],
        _ => [1.0; 4],
    };
    let output = add_output(editor);
    let picker = add_color_picker(editor, albedo)?;
    connect(editor, picker, 0, output, MaterialSlot::Albedo.index())?;
    Ok(output)
}

/// Locate the sink of a reloaded graph
pub fn find_output(editor: &NodeEditor) -> Option<NodeId> {
    editor
        .nodes()
        .find(|n| n.execution_type == ExecutionType::MaterialOutput && n.name == OUTPUT_NAME)
        .map(|n| n.id)
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluator writing a material graph into a material object
pub struct MaterialEvaluator {
    output_node: NodeId,
    assets: Arc<dyn AssetLookup>,
    material: SharedMaterial,
    stack: ValueStack<MaterialValue>,
}

impl MaterialEvaluator {
    /// Create an evaluator for the graph whose sink is `output_node`
    pub fn new(
        output_node: NodeId,
        assets: Arc<dyn AssetLookup>,
        material: SharedMaterial,
    ) -> Self {
        Self {
            output_node,
            assets,
            material,
            stack: ValueStack::new(),
        }
    }

    /// Material written by this evaluator
    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    fn evaluate_output(&mut self, node: &Node) -> Result<(), EvaluationError> {
        let entries = self.stack.drain();
        let mut material = self.material.lock();
        let mut albedo = false;

        for entry in entries {
            let value = entry.value;
            let Some(slot) = value.slot else {
                tracing::debug!(source = ?entry.source, "Dropping value without output slot");
                continue;
            };

            match slot {
                MaterialSlot::Albedo => {
                    if let Some(color) = value.color_operand() {
                        material.set_albedo_color(color);
                        albedo = true;
                    } else if let Some(texture) =
                        value.texture.and_then(|id| self.texture(id, slot))
                    {
                        material.set_albedo_map(&texture);
                        albedo = true;
                    }
                }
                MaterialSlot::Normal | MaterialSlot::Metallic | MaterialSlot::Roughness => {
                    let Some(id) = value.texture else {
                        tracing::warn!(?slot, source = ?entry.source, "Slot expects a texture");
                        continue;
                    };
                    let Some(texture) = self.texture(id, slot) else {
                        continue;
                    };
                    match slot {
                        MaterialSlot::Normal => material.set_normal_map(&texture),
                        MaterialSlot::Metallic => material.set_metallic_map(&texture),
                        _ => material.set_roughness_map(&texture),
                    }
                }
                MaterialSlot::Emission => match value.color_operand() {
                    Some(color) => material.set_emissive(color),
                    None => tracing::warn!(source = ?entry.source, "Emission expects a color"),
                },
            }
        }

        if !albedo {
            material.reset();
            return Err(EvaluationError::MissingValue {
                node: node.id,
                pin: "Albedo".to_string(),
            });
        }

        material.apply_changes();
        Ok(())
    }

    fn texture(&self, id: AssetId, slot: MaterialSlot) -> Option<Texture> {
        let texture = get_asset_as::<Texture>(self.assets.as_ref(), id);
        if texture.is_none() {
            tracing::warn!(asset = %id, ?slot, "Texture not found, skipping");
        }
        texture
    }

    fn evaluate_sampler(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
        visit: Visit,
    ) -> Result<(), EvaluationError> {
        let linked = self.stack.take_inputs(editor, node).into_iter().next().flatten();
        let pin = node.input(0).ok_or_else(|| EvaluationError::MissingInput {
            node: node.id,
            pin: "Texture".to_string(),
        })?;

        let texture = match linked {
            Some(entries) => entries
                .last()
                .and_then(|e| e.value.texture)
                .ok_or_else(|| EvaluationError::MissingValue {
                    node: node.id,
                    pin: pin.name.clone(),
                })?,
            None => pin
                .extra
                .read_asset_id(ASSET_ID_OFFSET)?
                .ok_or_else(|| EvaluationError::MissingInput {
                    node: node.id,
                    pin: pin.name.clone(),
                })?,
        };

        let value = MaterialValue::from_texture(slot_for(editor, visit), texture);
        self.stack.push(visit.feeds, node.id, value);
        Ok(())
    }

    fn evaluate_color_picker(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
        visit: Visit,
    ) -> Result<(), EvaluationError> {
        let [r, g, b, _] = picked_color(node)?;
        let value = MaterialValue::from_color(slot_for(editor, visit), [r, g, b]);
        self.stack.push(visit.feeds, node.id, value);
        Ok(())
    }

    fn evaluate_get_asset(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
        visit: Visit,
    ) -> Result<(), EvaluationError> {
        let id = asset::require_asset_id(node)?;
        let value = MaterialValue::from_texture(slot_for(editor, visit), id);
        self.stack.push(visit.feeds, node.id, value);
        Ok(())
    }

    fn evaluate_mix(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
        visit: Visit,
    ) -> Result<(), EvaluationError> {
        let inputs = self.stack.take_inputs(editor, node);
        let a = operand(node, &inputs, 0, |pin| pin.constant_color().map(rgb))?;
        let b = operand(node, &inputs, 1, |pin| pin.constant_color().map(rgb))?;
        let [factor, ..] = operand(node, &inputs, 2, |pin| pin.constant_float().map(|f| [f; 3]))?;

        let color = std::array::from_fn(|i| a[i] + (b[i] - a[i]) * factor);
        let value = MaterialValue::from_color(slot_for(editor, visit), color);
        self.stack.push(visit.feeds, node.id, value);
        Ok(())
    }

    fn evaluate_arithmetic(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
        visit: Visit,
        op: ArithmeticOp,
    ) -> Result<(), EvaluationError> {
        let inputs = self.stack.take_inputs(editor, node);
        let a = operand(node, &inputs, 0, |pin| pin.constant_float().map(|f| [f; 3]))?;
        let b = operand(node, &inputs, 1, |pin| pin.constant_float().map(|f| [f; 3]))?;

        let value = MaterialValue::from_color(slot_for(editor, visit), op.apply_rgb(a, b));
        self.stack.push(visit.feeds, node.id, value);
        Ok(())
    }
}

impl DomainEvaluator for MaterialEvaluator {
    fn domain(&self) -> Domain {
        Domain::Material
    }

    fn output_node(&self) -> NodeId {
        self.output_node
    }

    fn required_inputs(&self) -> &'static [usize] {
        &[0]
    }

    fn reset(&mut self) {
        self.material.lock().reset();
        self.stack.clear();
    }

    fn evaluate_node(
        &mut self,
        editor: &NodeEditor,
        node: &Node,
        visit: Visit,
    ) -> Result<(), EvaluationError> {
        match node.execution_type {
            ExecutionType::MaterialOutput => self.evaluate_output(node),
            ExecutionType::Sampler2D => self.evaluate_sampler(editor, node, visit),
            ExecutionType::ColorPicker => self.evaluate_color_picker(editor, node, visit),
            ExecutionType::GetAsset => self.evaluate_get_asset(editor, node, visit),
            ExecutionType::MaterialMixColors => self.evaluate_mix(editor, node, visit),
            ExecutionType::Add => self.evaluate_arithmetic(editor, node, visit, ArithmeticOp::Add),
            ExecutionType::Subtract => {
                self.evaluate_arithmetic(editor, node, visit, ArithmeticOp::Subtract)
            }
            ExecutionType::Multiply => {
                self.evaluate_arithmetic(editor, node, visit, ArithmeticOp::Multiply)
            }
            ExecutionType::Divide => {
                self.evaluate_arithmetic(editor, node, visit, ArithmeticOp::Divide)
            }
            _ => Err(EvaluationError::foreign(node, Domain::Material)),
        }
    }
}

impl fmt::Debug for MaterialEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialEvaluator")
            .field("output_node", &self.output_node)
            .field("stack", &self.stack.len())
            .finish_non_exhaustive()
    }
}

/// Output slot a visit produces for, if it feeds the material sink directly
fn slot_for(editor: &NodeEditor, visit: Visit) -> Option<MaterialSlot> {
    let pin = visit.feeds?;
    let target = editor.find_node_by_pin(pin)?;
    if target.execution_type != ExecutionType::MaterialOutput {
        return None;
    }
    target.input_index(pin).and_then(MaterialSlot::from_index)
}

fn rgb([r, g, b, _]: [f32; 4]) -> [f32; 3] {
    [r, g, b]
}

/// Color operand of input `index`: the linked value, else the pin constant
fn operand(
    node: &Node,
    inputs: &[Option<Vec<StackEntry<MaterialValue>>>],
    index: usize,
    constant: impl Fn(&Pin) -> Result<[f32; 3], ExtraDataError>,
) -> Result<[f32; 3], EvaluationError> {
    let pin = node.input(index).ok_or_else(|| EvaluationError::MissingInput {
        node: node.id,
        pin: format!("#{index}"),
    })?;

    match inputs.get(index).and_then(Option::as_ref) {
        Some(entries) => entries
            .last()
            .and_then(|e| e.value.color_operand())
            .ok_or_else(|| EvaluationError::MissingValue {
                node: node.id,
                pin: pin.name.clone(),
            }),
        None => Ok(constant(pin)?),
    }
}
