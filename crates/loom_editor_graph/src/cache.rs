// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted node caches and per-editor user settings.
//!
//! A node cache is the RON snapshot of one graph, stored next to the asset
//! it edits as `<asset-id>.nodecache`. User settings are a small binary
//! blob: a fixed header followed by bincode-encoded entries.

use crate::editor::{EditorError, NodeEditor};
use crate::host::AssetId;
use crate::link::Link;
use crate::node::Node;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current node cache format version
pub const NODE_CACHE_VERSION: u32 = 1;

/// File extension of node caches
pub const NODE_CACHE_EXTENSION: &str = "nodecache";

/// Magic bytes opening a user settings blob
pub const USER_SETTINGS_MAGIC: [u8; 4] = *b"LNUS";

/// Current user settings format version
pub const USER_SETTINGS_VERSION: u32 = 1;

/// Error reading or writing persisted editor state
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Value could not be rendered as RON
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Binary encoding failed
    #[error("Binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    /// Snapshot does not form a valid graph
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// Written by a newer version
    #[error("Format version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version understood
        supported: u32,
    },

    /// Blob does not start with the expected magic
    #[error("Not a user settings blob")]
    BadMagic,

    /// Blob is shorter than its header
    #[error("User settings blob is truncated")]
    Truncated,

    /// Entry count does not fit the header
    #[error("Too many entries: {0}")]
    TooManyEntries(usize),
}

// ============================================================================
// Node cache
// ============================================================================

/// Serialized form of one graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEditorCache {
    /// Format version
    pub version: u32,
    /// Graph name
    pub name: String,
    /// Nodes in insertion order
    pub nodes: Vec<Node>,
    /// Links
    pub links: Vec<Link>,
}

impl NodeEditorCache {
    /// Snapshot a graph; the runtime is not part of the cache
    pub fn capture(editor: &NodeEditor) -> Self {
        Self {
            version: NODE_CACHE_VERSION,
            name: editor.name.clone(),
            nodes: editor.nodes().cloned().collect(),
            links: editor.links().to_vec(),
        }
    }

    /// Rebuild the graph
    pub fn restore(self) -> Result<NodeEditor, CacheError> {
        if self.version > NODE_CACHE_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: self.version,
                supported: NODE_CACHE_VERSION,
            });
        }
        Ok(NodeEditor::from_parts(self.name, self.nodes, self.links)?)
    }

    /// Render as pretty RON
    pub fn to_ron(&self) -> Result<String, CacheError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Parse from RON text
    pub fn from_ron(text: &str) -> Result<Self, CacheError> {
        Ok(ron::from_str(text)?)
    }
}

/// Location of the node cache of `asset` inside `dir`
pub fn cache_path(dir: &Path, asset: AssetId) -> PathBuf {
    dir.join(format!("{asset}.{NODE_CACHE_EXTENSION}"))
}

/// Write the node cache of `asset`, creating `dir` if needed
pub fn save_node_cache(
    dir: &Path,
    asset: AssetId,
    editor: &NodeEditor,
) -> Result<PathBuf, CacheError> {
    std::fs::create_dir_all(dir)?;
    let path = cache_path(dir, asset);
    std::fs::write(&path, NodeEditorCache::capture(editor).to_ron()?)?;
    tracing::debug!(path = %path.display(), nodes = editor.node_count(), "Saved node cache");
    Ok(path)
}

/// Load the node cache of `asset`; `None` when no cache exists yet
pub fn load_node_cache(dir: &Path, asset: AssetId) -> Result<Option<NodeEditor>, CacheError> {
    let path = cache_path(dir, asset);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let editor = NodeEditorCache::from_ron(&content)?.restore()?;
    tracing::debug!(path = %path.display(), nodes = editor.node_count(), "Loaded node cache");
    Ok(Some(editor))
}

// ============================================================================
// User settings
// ============================================================================

/// Per-asset editor panel state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorUserSettings {
    /// Asset the editor is open on
    pub asset: AssetId,
    /// Properties panel visible
    pub properties_open: bool,
    /// Preview panel visible
    pub preview_open: bool,
    /// Canvas pan
    pub pan: [f32; 2],
    /// Canvas zoom
    pub zoom: f32,
}

impl EditorUserSettings {
    /// Defaults for a freshly opened editor
    pub fn new(asset: AssetId) -> Self {
        Self {
            asset,
            properties_open: true,
            preview_open: true,
            pan: [0.0, 0.0],
            zoom: 1.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct UserSettingsHeader {
    magic: [u8; 4],
    count: u32,
    version: u32,
}

const HEADER_LEN: usize = std::mem::size_of::<UserSettingsHeader>();

/// Encode settings entries into a blob
pub fn write_user_settings(entries: &[EditorUserSettings]) -> Result<Vec<u8>, CacheError> {
    let count =
        u32::try_from(entries.len()).map_err(|_| CacheError::TooManyEntries(entries.len()))?;
    let header = UserSettingsHeader {
        magic: USER_SETTINGS_MAGIC,
        count: count.to_le(),
        version: USER_SETTINGS_VERSION.to_le(),
    };

    let mut blob = bytemuck::bytes_of(&header).to_vec();
    for entry in entries {
        bincode::serialize_into(&mut blob, entry)?;
    }
    Ok(blob)
}

/// Decode a blob written by [`write_user_settings`]
pub fn read_user_settings(blob: &[u8]) -> Result<Vec<EditorUserSettings>, CacheError> {
    let header_bytes = blob.get(..HEADER_LEN).ok_or(CacheError::Truncated)?;
    let header: UserSettingsHeader = bytemuck::pod_read_unaligned(header_bytes);
    if header.magic != USER_SETTINGS_MAGIC {
        return Err(CacheError::BadMagic);
    }
    let version = u32::from_le(header.version);
    if version != USER_SETTINGS_VERSION {
        return Err(CacheError::UnsupportedVersion {
            found: version,
            supported: USER_SETTINGS_VERSION,
        });
    }

    let mut rest = &blob[HEADER_LEN..];
    (0..u32::from_le(header.count))
        .map(|_| Ok(bincode::deserialize_from(&mut rest)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::material;
    use crate::graphs::sound;
    use crate::host::Material;

    fn sound_graph() -> NodeEditor {
        let mut editor = NodeEditor::new("Rain");
        let output = sound::build_default_graph(&mut editor);
        let mixer = sound::add_sound_mixer(&mut editor, 2);
        let player = sound::add_player(&mut editor, Some(AssetId::new())).unwrap();
        crate::graphs::connect(&mut editor, player, 0, mixer, 1).unwrap();
        crate::graphs::connect(&mut editor, mixer, 0, output, 0).unwrap();
        editor
    }

    #[test]
    fn test_node_cache_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        let asset = AssetId::new();
        let editor = sound_graph();

        let path = save_node_cache(dir.path(), asset, &editor).unwrap();
        assert_eq!(path.extension().unwrap(), NODE_CACHE_EXTENSION);

        let loaded = load_node_cache(dir.path(), asset).unwrap().unwrap();
        assert_eq!(NodeEditorCache::capture(&loaded), NodeEditorCache::capture(&editor));

        let output = sound::find_output(&loaded).unwrap();
        let mut order = Vec::new();
        loaded.traverse_from_start(output, |id| order.push(id));
        let mut expected = Vec::new();
        editor.traverse_from_start(output, |id| expected.push(id));
        assert_eq!(order, expected);
    }

    #[test]
    fn test_missing_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_node_cache(dir.path(), AssetId::new()).unwrap().is_none());
    }

    #[test]
    fn test_dangling_link_is_rejected() {
        let mut editor = NodeEditor::new("Stone");
        let stone = Material::new("Stone", [0.3, 0.3, 0.3]);
        material::build_default_graph(&mut editor, &stone).unwrap();
        let mut cache = NodeEditorCache::capture(&editor);
        cache.nodes.retain(|n| n.execution_type != crate::node::ExecutionType::ColorPicker);

        let text = cache.to_ron().unwrap();
        assert!(matches!(
            NodeEditorCache::from_ron(&text).unwrap().restore(),
            Err(CacheError::Editor(EditorError::DanglingLink(_)))
        ));
    }

    #[test]
    fn test_doubly_linked_input_is_rejected() {
        let mut cache = NodeEditorCache::capture(&sound_graph());
        let first = cache.links[0];
        cache.links.push(Link::new(first.start_pin, first.end_pin));

        let text = cache.to_ron().unwrap();
        assert!(matches!(
            NodeEditorCache::from_ron(&text).unwrap().restore(),
            Err(CacheError::Editor(EditorError::DuplicateInput(pin))) if pin == first.end_pin
        ));
    }

    #[test]
    fn test_newer_cache_is_rejected() {
        let mut cache = NodeEditorCache::capture(&sound_graph());
        cache.version = NODE_CACHE_VERSION + 1;
        assert!(matches!(cache.restore(), Err(CacheError::UnsupportedVersion { .. })));
    }

    #[test]
    fn test_user_settings_blob() {
        let mut zoomed = EditorUserSettings::new(AssetId::new());
        zoomed.zoom = 2.5;
        zoomed.pan = [10.0, -4.0];
        zoomed.preview_open = false;
        let entries = vec![EditorUserSettings::new(AssetId::new()), zoomed];

        let blob = write_user_settings(&entries).unwrap();
        assert_eq!(&blob[..4], b"LNUS");
        assert_eq!(read_user_settings(&blob).unwrap(), entries);
    }

    #[test]
    fn test_user_settings_rejects_bad_blobs() {
        let mut blob = write_user_settings(&[EditorUserSettings::new(AssetId::new())]).unwrap();

        assert!(matches!(read_user_settings(&blob[..6]), Err(CacheError::Truncated)));
        assert!(matches!(
            read_user_settings(&blob[..HEADER_LEN + 3]),
            Err(CacheError::Binary(_))
        ));

        blob[8] = 9;
        assert!(matches!(
            read_user_settings(&blob),
            Err(CacheError::UnsupportedVersion { found: 9, .. })
        ));

        blob[0] = b'X';
        assert!(matches!(read_user_settings(&blob), Err(CacheError::BadMagic)));
    }
}
