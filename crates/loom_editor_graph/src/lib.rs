// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph evaluation engine for Loom Editor.
//!
//! This crate provides the graph model behind the editor's visual
//! authoring surfaces:
//! - Material graphs, which write textures and colors into a material
//! - Sound graphs, which spawn preview sounds through the audio system
//!
//! ## Architecture
//!
//! A [`NodeEditor`] owns nodes, pins and links. Evaluation walks the graph
//! from a domain's output node and hands each visit to the attached
//! [`Runtime`], which keeps a LIFO [`evaluation::ValueStack`] of values
//! flowing between nodes. Assets, materials and audio are reached through
//! the traits in [`host`].

pub mod cache;
pub mod editor;
pub mod evaluation;
pub mod extra_data;
pub mod graphs;
pub mod host;
pub mod link;
pub mod node;
pub mod pin;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheError, EditorUserSettings, NodeEditorCache};
pub use editor::{EditorError, LinkError, NodeEditor, Visit};
pub use evaluation::{CompilationStatus, Domain, DomainEvaluator, EvaluationError, Runtime};
pub use extra_data::{ExtraData, ExtraDataError};
pub use graphs::material::MaterialEvaluator;
pub use graphs::sound::SoundEvaluator;
pub use link::{Link, LinkId};
pub use node::{ExecutionType, Node, NodeId, NodeLibrary, NodeSpec};
pub use pin::{Pin, PinId, PinKind, PinSpec, PinType};
pub use settings::{RandomRange, RuntimeSettings, SettingsError};
