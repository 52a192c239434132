//! Document source tree.
//!
//! # Module Structure
//!
//! - `path` - [`SourcePath`], the derived identity of a node
//! - `tree` - [`SourceTree`], the arena-backed forest with resolution,
//!   insertion, renaming and removal
//! - `error` - [`SourceError`]
//!
//! Nodes live in an arena owned by the tree. A node's `parent` is a plain
//! [`NodeId`], never an owning pointer: ownership belongs to the parent's
//! child list (or the tree's root list).
//!
//! [`SourceEntry`] is the owned, detached form of a subtree. It is what
//! callers construct before inserting, what the package codec decodes into,
//! and what `snapshot` hands out to observers.

mod error;
mod path;
mod tree;

pub use error::SourceError;
pub use path::{SourcePath, is_valid_name, validate_name};
pub use tree::SourceTree;

pub(crate) use path::extension_of;

use crate::engine::Highlighted;
use crate::hash::ContentHash;

/// Extension of text sources the engine compiles.
pub const SOURCE_EXTENSION: &str = "typ";

/// Base name for auto-generated sources.
pub const UNTITLED: &str = "untitled";

// =============================================================================
// Handles
// =============================================================================

/// Handle to a node inside a [`SourceTree`].
///
/// Handles carry a generation, so a handle to a removed node never aliases a
/// node inserted later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

// =============================================================================
// Node kinds
// =============================================================================

/// Variant of a source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Folder,
    Text,
    Image,
    Opaque,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Text => "text",
            Self::Image => "image",
            Self::Opaque => "file",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Highlighting result cached on a text node, valid while the text hashes
/// to `text_hash`.
#[derive(Debug, Clone)]
pub struct HighlightCache {
    pub text_hash: ContentHash,
    pub result: Highlighted,
}

/// Payload of an attached node.
#[derive(Debug, Clone)]
pub enum NodeContent {
    Folder(Vec<NodeId>),
    Text {
        text: String,
        highlight: Option<HighlightCache>,
    },
    Image(Vec<u8>),
    Opaque(Vec<u8>),
}

/// A node attached to a [`SourceTree`].
#[derive(Debug, Clone)]
pub struct SourceNode {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) content: NodeContent,
}

impl SourceNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    pub fn kind(&self) -> SourceKind {
        match self.content {
            NodeContent::Folder(_) => SourceKind::Folder,
            NodeContent::Text { .. } => SourceKind::Text,
            NodeContent::Image(_) => SourceKind::Image,
            NodeContent::Opaque(_) => SourceKind::Opaque,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.content, NodeContent::Folder(_))
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Leaf payload as bytes (UTF-8 for text). `None` for folders.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.content {
            NodeContent::Folder(_) => None,
            NodeContent::Text { text, .. } => Some(text.as_bytes()),
            NodeContent::Image(bytes) | NodeContent::Opaque(bytes) => Some(bytes),
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.content {
            NodeContent::Folder(children) => children,
            _ => &[],
        }
    }
}

// =============================================================================
// Detached entries
// =============================================================================

/// Owned, detached form of a subtree.
///
/// Equality compares names and content recursively, so two text entries are
/// equal only when their text is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEntry {
    Folder {
        name: String,
        children: Vec<SourceEntry>,
    },
    Text {
        name: String,
        text: String,
    },
    Image {
        name: String,
        bytes: Vec<u8>,
    },
    Opaque {
        name: String,
        bytes: Vec<u8>,
    },
}

impl SourceEntry {
    pub fn folder(name: impl Into<String>, children: Vec<SourceEntry>) -> Self {
        Self::Folder {
            name: name.into(),
            children,
        }
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn image(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Image {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn opaque(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Opaque {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Folder { name, .. }
            | Self::Text { name, .. }
            | Self::Image { name, .. }
            | Self::Opaque { name, .. } => name,
        }
    }

    pub(crate) fn set_name(&mut self, new_name: String) {
        match self {
            Self::Folder { name, .. }
            | Self::Text { name, .. }
            | Self::Image { name, .. }
            | Self::Opaque { name, .. } => *name = new_name,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Folder { .. } => SourceKind::Folder,
            Self::Text { .. } => SourceKind::Text,
            Self::Image { .. } => SourceKind::Image,
            Self::Opaque { .. } => SourceKind::Opaque,
        }
    }

    /// Leaf payload as bytes (UTF-8 for text). `None` for folders.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Folder { .. } => None,
            Self::Text { text, .. } => Some(text.as_bytes()),
            Self::Image { bytes, .. } | Self::Opaque { bytes, .. } => Some(bytes),
        }
    }

    /// Default name for an auto-named entry of this kind, before
    /// disambiguation: `untitled.typ` for text, `untitled` for folders, and
    /// `untitled.<ext>` for binary entries that already carry an extension.
    pub fn untitled_name(&self) -> String {
        match self {
            Self::Folder { .. } => UNTITLED.to_string(),
            Self::Text { .. } => format!("{UNTITLED}.{SOURCE_EXTENSION}"),
            Self::Image { name, .. } | Self::Opaque { name, .. } => match extension_of(name) {
                Some(ext) => format!("{UNTITLED}.{ext}"),
                None => UNTITLED.to_string(),
            },
        }
    }

    /// Every `(path, kind, bytes)` triple in this subtree, rooted at `base`.
    pub fn flatten(&self, base: &SourcePath) -> Vec<(SourcePath, SourceKind, Option<Vec<u8>>)> {
        let mut out = Vec::new();
        self.flatten_into(base, &mut out);
        out
    }

    fn flatten_into(
        &self,
        base: &SourcePath,
        out: &mut Vec<(SourcePath, SourceKind, Option<Vec<u8>>)>,
    ) {
        let path = base.join(self.name());
        out.push((path.clone(), self.kind(), self.bytes().map(<[u8]>::to_vec)));
        if let Self::Folder { children, .. } = self {
            for child in children {
                child.flatten_into(&path, out);
            }
        }
    }
}

/// Check whether a file name follows the source-file convention.
pub fn is_source_name(name: &str) -> bool {
    extension_of(name) == Some(SOURCE_EXTENSION)
}

/// Variant a leaf with this name and payload is read back as.
///
/// Tried in order: Image (payload decodes as a supported bitmap), Text
/// (`.typ` name and UTF-8 payload), Opaque. The tree refuses leaves whose
/// variant disagrees, so saving and reopening keeps every variant.
pub fn leaf_kind(name: &str, bytes: &[u8]) -> SourceKind {
    if is_bitmap(bytes) {
        SourceKind::Image
    } else if is_source_name(name) && std::str::from_utf8(bytes).is_ok() {
        SourceKind::Text
    } else {
        SourceKind::Opaque
    }
}

/// Check whether `bytes` decode as an image with an enabled codec.
fn is_bitmap(bytes: &[u8]) -> bool {
    // Cheap signature check before paying for a full decode
    if image::guess_format(bytes).is_err() {
        return false;
    }
    image::load_from_memory(bytes).is_ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// A small PNG produced by the `image` encoder.
    pub(crate) fn sample_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 30, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_untitled_names() {
        assert_eq!(SourceEntry::text("x", "").untitled_name(), "untitled.typ");
        assert_eq!(SourceEntry::folder("x", vec![]).untitled_name(), "untitled");
        assert_eq!(SourceEntry::image("logo.png", vec![]).untitled_name(), "untitled.png");
        assert_eq!(SourceEntry::opaque("LICENSE", vec![]).untitled_name(), "untitled");
    }

    #[test]
    fn test_entry_equality_compares_text() {
        assert_eq!(SourceEntry::text("a.typ", "x"), SourceEntry::text("a.typ", "x"));
        assert_ne!(SourceEntry::text("a.typ", "x"), SourceEntry::text("a.typ", "y"));
    }

    #[test]
    fn test_flatten() {
        let entry = SourceEntry::folder(
            "assets",
            vec![SourceEntry::opaque("logo.png", vec![1, 2, 3])],
        );
        let flat = entry.flatten(&SourcePath::root());
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[1].0.to_string(), "/assets/logo.png");
        assert_eq!(flat[1].2.as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_is_source_name() {
        assert!(is_source_name("main.typ"));
        assert!(!is_source_name("main.typ.bak"));
        assert!(!is_source_name(".typ"));
    }

    #[test]
    fn test_leaf_kind() {
        assert_eq!(leaf_kind("main.typ", b"= Hi"), SourceKind::Text);
        assert_eq!(leaf_kind("odd.typ", &sample_png()), SourceKind::Image);
        assert_eq!(leaf_kind("notes.md", b"# Hi"), SourceKind::Opaque);
        assert_eq!(leaf_kind("bad.typ", &[0xff, 0xfe]), SourceKind::Opaque);
        // PNG signature with nothing behind it
        assert_eq!(leaf_kind("logo.png", b"\x89PNG\r\n\x1a\n"), SourceKind::Opaque);
    }
}
