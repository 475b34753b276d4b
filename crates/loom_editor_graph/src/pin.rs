// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin definitions for node inputs/outputs.

use crate::extra_data::{ExtraData, ExtraDataError};
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinId(pub Uuid);

impl PinId {
    /// Create a new random pin ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PinId {
    fn default() -> Self {
        Self::new()
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinKind {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

/// Value type carried by a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinType {
    /// Scalar value
    Float,
    /// Reference to an asset by id
    AssetHandle,
    /// Sampled 2D texture
    Sampler2D,
    /// All four channels of a sample
    Rgba,
    /// Red channel
    Red,
    /// Green channel
    Green,
    /// Blue channel
    Blue,
    /// Alpha channel
    Alpha,
    /// Constant color
    Color,
    /// Sound stream
    Audio,
}

impl PinType {
    /// Get the color for this pin type (for UI)
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Float => [80, 200, 80],
            Self::AssetHandle => [200, 100, 150],
            Self::Sampler2D => [100, 150, 200],
            Self::Rgba => [200, 100, 200],
            Self::Red => [220, 70, 70],
            Self::Green => [70, 220, 70],
            Self::Blue => [70, 70, 220],
            Self::Alpha => [200, 200, 200],
            Self::Color => [255, 200, 100],
            Self::Audio => [80, 200, 200],
        }
    }
}

/// A typed slot on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Unique pin ID
    pub id: PinId,
    /// Owning node
    pub node: NodeId,
    /// Pin name
    pub name: String,
    /// Data type, fixed at creation
    pub pin_type: PinType,
    /// Pin direction
    pub kind: PinKind,
    /// Constant payload used while the pin is unconnected
    pub extra: ExtraData,
}

impl Pin {
    /// Create a new pin owned by `node`
    pub fn new(node: NodeId, name: impl Into<String>, pin_type: PinType, kind: PinKind) -> Self {
        Self {
            id: PinId::new(),
            node,
            name: name.into(),
            pin_type,
            kind,
            extra: ExtraData::new(),
        }
    }

    /// Whether this is an input pin
    pub fn is_input(&self) -> bool {
        self.kind == PinKind::Input
    }

    /// Whether this is an output pin
    pub fn is_output(&self) -> bool {
        self.kind == PinKind::Output
    }

    /// Read the constant scalar stored at offset 0
    pub fn constant_float(&self) -> Result<f32, ExtraDataError> {
        self.extra.read(0)
    }

    /// Read the constant RGBA stored at offset 0
    pub fn constant_color(&self) -> Result<[f32; 4], ExtraDataError> {
        self.extra.read(0)
    }
}

/// Declared layout of one pin in a [`crate::node::NodeSpec`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinSpec {
    /// Pin name
    pub name: String,
    /// Data type
    pub pin_type: PinType,
    /// Initial extra data
    pub extra: ExtraData,
}

impl PinSpec {
    /// Declare a pin with an empty payload
    pub fn new(name: impl Into<String>, pin_type: PinType) -> Self {
        Self {
            name: name.into(),
            pin_type,
            extra: ExtraData::new(),
        }
    }

    /// Set the initial payload
    pub fn with_extra(mut self, extra: ExtraData) -> Self {
        self.extra = extra;
        self
    }

    /// Instantiate this spec for `node`
    pub fn build(&self, node: NodeId, kind: PinKind) -> Pin {
        let mut pin = Pin::new(node, self.name.clone(), self.pin_type, kind);
        pin.extra = self.extra;
        pin
    }
}
