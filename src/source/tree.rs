//! Arena-backed source forest.
//!
//! Paths are derived by walking `parent` links, so resolution and collision
//! checks walk the tree and compare derived paths. Trees are small (tens to
//! hundreds of nodes), which keeps the O(n * depth) scans cheap.

use rustc_hash::FxHashSet;

use super::{
    HighlightCache, NodeContent, NodeId, SourceEntry, SourceError, SourceKind, SourceNode,
    SourcePath, leaf_kind, validate_name,
};
use crate::engine::Highlighted;
use crate::hash::ContentHash;

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<SourceNode>,
}

/// Ordered forest of source nodes.
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
}

// =============================================================================
// Construction & access
// =============================================================================

impl SourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from detached entries, in order.
    ///
    /// Fails on the first entry that would violate path uniqueness.
    pub fn from_entries(entries: impl IntoIterator<Item = SourceEntry>) -> Result<Self, SourceError> {
        let mut tree = Self::new();
        for entry in entries {
            tree.insert(entry, None)?;
        }
        Ok(tree)
    }

    /// Root-level nodes in display order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&SourceNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut SourceNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn node(&self, id: NodeId) -> Result<&SourceNode, SourceError> {
        self.get(id).ok_or(SourceError::StaleHandle)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SourceNode, SourceError> {
        self.get_mut(id).ok_or(SourceError::StaleHandle)
    }

    /// Number of attached nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Children of `folder`, or the roots for `None`.
    pub fn children(&self, folder: Option<NodeId>) -> Result<&[NodeId], SourceError> {
        match folder {
            None => Ok(&self.roots),
            Some(id) => {
                let node = self.node(id)?;
                match &node.content {
                    NodeContent::Folder(children) => Ok(children),
                    _ => Err(SourceError::NotAFolder(self.path(id)?)),
                }
            }
        }
    }

    /// All nodes in depth-first preorder (display order).
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            out.push(id);
            stack.extend(node.children().iter().rev().copied());
        }
        out
    }
}

// =============================================================================
// Paths & resolution
// =============================================================================

impl SourceTree {
    /// Derive the path of a node by walking its parents.
    pub fn path(&self, id: NodeId) -> Result<SourcePath, SourceError> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id)?;
            names.push(node.name.as_str());
            current = node.parent;
        }
        names.reverse();
        SourcePath::from_components(names)
    }

    /// Find the node at `path`, searching depth-first from the roots.
    pub fn resolve(&self, path: &SourcePath) -> Option<NodeId> {
        self.resolve_among(&self.roots, path)
    }

    /// Find the node at `path`, searching only below `folder`.
    pub fn resolve_in(&self, folder: NodeId, path: &SourcePath) -> Option<NodeId> {
        let children = self.children(Some(folder)).ok()?;
        self.resolve_among(children, path)
    }

    fn resolve_among(&self, nodes: &[NodeId], path: &SourcePath) -> Option<NodeId> {
        for &id in nodes {
            if self.path(id).ok().as_ref() == Some(path) {
                return Some(id);
            }
            let Some(node) = self.get(id) else { continue };
            if node.is_folder()
                && let Some(found) = self.resolve_among(node.children(), path)
            {
                return Some(found);
            }
        }
        None
    }

    pub fn contains(&self, path: &SourcePath) -> bool {
        self.resolve(path).is_some()
    }

    /// Check whether `id`, or any node below it, lives at `candidate`.
    pub fn path_collides_with(&self, id: NodeId, candidate: &SourcePath) -> bool {
        if self.path(id).ok().as_ref() == Some(candidate) {
            return true;
        }
        self.get(id).is_some_and(|node| {
            node.children()
                .iter()
                .any(|&child| self.path_collides_with(child, candidate))
        })
    }

    /// Check every node of the tree, from the roots, against `candidate`.
    fn collides_anywhere(&self, candidate: &SourcePath) -> bool {
        self.roots
            .iter()
            .any(|&root| self.path_collides_with(root, candidate))
    }

    /// Path that `name` would have inside `folder` (or at root level).
    fn candidate_path(&self, folder: Option<NodeId>, name: &str) -> Result<SourcePath, SourceError> {
        let base = match folder {
            Some(id) => self.path(id)?,
            None => SourcePath::root(),
        };
        Ok(base.join(name))
    }
}

// =============================================================================
// Mutation
// =============================================================================

impl SourceTree {
    /// Append `entry` to `into`'s children (or the roots).
    ///
    /// The name is used as given; a collision with any existing path is an
    /// error and leaves the tree unchanged.
    pub fn insert(&mut self, entry: SourceEntry, into: Option<NodeId>) -> Result<NodeId, SourceError> {
        self.ensure_folder(into)?;
        let candidate = self.candidate_path(into, entry.name())?;
        validate_entry(&entry, &candidate)?;
        if self.collides_anywhere(&candidate) {
            return Err(SourceError::Collision(candidate));
        }
        Ok(self.attach(entry, into))
    }

    /// Append `entry` under an auto-generated name.
    ///
    /// Tries `untitled`, `untitled 1`, `untitled 2`, ... (keeping the
    /// kind's extension) until the path is free.
    pub fn insert_untitled(
        &mut self,
        mut entry: SourceEntry,
        into: Option<NodeId>,
    ) -> Result<NodeId, SourceError> {
        self.ensure_folder(into)?;
        let base = entry.untitled_name();
        let (stem, ext) = match base.split_once('.') {
            Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
            None => (base.clone(), String::new()),
        };

        let mut name = base;
        let mut suffix = 0u32;
        while self.collides_anywhere(&self.candidate_path(into, &name)?) {
            suffix += 1;
            name = format!("{stem} {suffix}{ext}");
        }

        entry.set_name(name);
        self.insert(entry, into)
    }

    /// Rename a node.
    ///
    /// The candidate path is checked against the whole tree, not only the
    /// siblings. On collision the node keeps its old name. A leaf keeps its
    /// variant, so a text source cannot lose its `.typ` extension.
    pub fn rename(&mut self, id: NodeId, new_name: &str) -> Result<(), SourceError> {
        let new_name = validate_name(new_name)?;
        let node = self.node(id)?;
        if node.name == new_name {
            return Ok(());
        }

        let candidate = self.candidate_path(node.parent, &new_name)?;
        if self.collides_anywhere(&candidate) {
            return Err(SourceError::Collision(candidate));
        }
        if let Some(bytes) = node.bytes() {
            check_leaf(&candidate, node.kind(), bytes)?;
        }

        self.node_mut(id)?.name = new_name;
        Ok(())
    }

    /// Detach a node and its subtree, returning it as an entry.
    pub fn remove(&mut self, id: NodeId) -> Result<SourceEntry, SourceError> {
        let entry = self.entry(id)?;
        let parent = self.node(id)?.parent;

        match parent {
            Some(parent) => {
                if let NodeContent::Folder(children) = &mut self.node_mut(parent)?.content {
                    children.retain(|&child| child != id);
                }
            }
            None => self.roots.retain(|&root| root != id),
        }

        self.release(id);
        Ok(entry)
    }

    /// Replace a text node's content. Drops any cached highlighting.
    pub fn set_text(&mut self, id: NodeId, new_text: impl Into<String>) -> Result<(), SourceError> {
        let path = self.path(id)?;
        let new_text = new_text.into();
        if self.node(id)?.kind() == SourceKind::Text {
            check_leaf(&path, SourceKind::Text, new_text.as_bytes())?;
        }
        match &mut self.node_mut(id)?.content {
            NodeContent::Text { text, highlight } => {
                *text = new_text;
                *highlight = None;
                Ok(())
            }
            _ => Err(SourceError::NotText(path)),
        }
    }

    /// Replace a binary node's content.
    ///
    /// The new payload must read back as the node's variant: an image stays
    /// decodable and an opaque file does not turn into an image or a source.
    pub fn set_bytes(&mut self, id: NodeId, new_bytes: Vec<u8>) -> Result<(), SourceError> {
        let path = self.path(id)?;
        let kind = self.node(id)?.kind();
        if matches!(kind, SourceKind::Image | SourceKind::Opaque) {
            check_leaf(&path, kind, &new_bytes)?;
        }
        match &mut self.node_mut(id)?.content {
            NodeContent::Image(bytes) | NodeContent::Opaque(bytes) => {
                *bytes = new_bytes;
                Ok(())
            }
            NodeContent::Folder(_) => Err(SourceError::IsAFolder(path)),
            NodeContent::Text { .. } => Err(SourceError::NotText(path)),
        }
    }

    fn ensure_folder(&self, into: Option<NodeId>) -> Result<(), SourceError> {
        self.children(into).map(|_| ())
    }

    fn attach(&mut self, entry: SourceEntry, parent: Option<NodeId>) -> NodeId {
        let (name, content, children) = match entry {
            SourceEntry::Folder { name, children } => (name, NodeContent::Folder(Vec::new()), children),
            SourceEntry::Text { name, text } => (
                name,
                NodeContent::Text {
                    text,
                    highlight: None,
                },
                Vec::new(),
            ),
            SourceEntry::Image { name, bytes } => (name, NodeContent::Image(bytes), Vec::new()),
            SourceEntry::Opaque { name, bytes } => (name, NodeContent::Opaque(bytes), Vec::new()),
        };

        let id = self.alloc(SourceNode {
            name,
            parent,
            content,
        });

        for child in children {
            self.attach(child, Some(id));
        }

        match parent {
            Some(parent) => {
                if let Some(SourceNode {
                    content: NodeContent::Folder(list),
                    ..
                }) = self.get_mut(parent)
                {
                    list.push(id);
                }
            }
            None => self.roots.push(id),
        }
        id
    }

    #[allow(clippy::cast_possible_truncation)] // Trees never approach u32::MAX nodes
    fn alloc(&mut self, node: SourceNode) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn release(&mut self, id: NodeId) {
        let children = self.get(id).map(|node| node.children().to_vec()).unwrap_or_default();
        for child in children {
            self.release(child);
        }
        if let Some(slot) = self.slots.get_mut(id.index as usize)
            && slot.generation == id.generation
        {
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
        }
    }
}

// =============================================================================
// Reading
// =============================================================================

impl SourceTree {
    /// Read the bytes of the leaf at `path` (UTF-8 for text sources).
    pub fn read(&self, path: &SourcePath) -> Result<Vec<u8>, SourceError> {
        let id = self
            .resolve(path)
            .ok_or_else(|| SourceError::NotFound(path.clone()))?;
        self.node(id)?
            .bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| SourceError::IsAFolder(path.clone()))
    }

    /// Detached copy of the subtree at `id`.
    pub fn entry(&self, id: NodeId) -> Result<SourceEntry, SourceError> {
        let node = self.node(id)?;
        let name = node.name.clone();
        Ok(match &node.content {
            NodeContent::Folder(children) => SourceEntry::Folder {
                name,
                children: children
                    .iter()
                    .map(|&child| self.entry(child))
                    .collect::<Result<_, _>>()?,
            },
            NodeContent::Text { text, .. } => SourceEntry::Text {
                name,
                text: text.clone(),
            },
            NodeContent::Image(bytes) => SourceEntry::Image {
                name,
                bytes: bytes.clone(),
            },
            NodeContent::Opaque(bytes) => SourceEntry::Opaque {
                name,
                bytes: bytes.clone(),
            },
        })
    }

    /// Detached copy of the whole forest, in display order.
    pub fn snapshot(&self) -> Vec<SourceEntry> {
        self.roots
            .iter()
            .filter_map(|&root| self.entry(root).ok())
            .collect()
    }

    /// Paths of every text source, in display order.
    pub fn text_sources(&self) -> Vec<SourcePath> {
        self.walk()
            .into_iter()
            .filter(|&id| self.get(id).is_some_and(|n| n.kind() == SourceKind::Text))
            .filter_map(|id| self.path(id).ok())
            .collect()
    }

    /// Cached highlighting for the text node at `path`, if computed for
    /// text hashing to `text_hash`.
    pub fn cached_highlight(&self, path: &SourcePath, text_hash: ContentHash) -> Option<Highlighted> {
        let node = self.get(self.resolve(path)?)?;
        match &node.content {
            NodeContent::Text {
                highlight: Some(cache),
                ..
            } if cache.text_hash == text_hash => Some(cache.result.clone()),
            _ => None,
        }
    }

    /// Store highlighting on the text node at `path`.
    ///
    /// Skipped (returns false) when the node is gone or its text has changed
    /// since `text_hash` was computed.
    pub fn store_highlight(&mut self, path: &SourcePath, text_hash: ContentHash, result: Highlighted) -> bool {
        let Some(id) = self.resolve(path) else {
            return false;
        };
        let Some(node) = self.get_mut(id) else {
            return false;
        };
        match &mut node.content {
            NodeContent::Text { text, highlight } if ContentHash::of(text.as_bytes()) == text_hash => {
                *highlight = Some(HighlightCache { text_hash, result });
                true
            }
            _ => false,
        }
    }
}

/// Validate names and sibling uniqueness inside a detached entry.
fn validate_entry(entry: &SourceEntry, path: &SourcePath) -> Result<(), SourceError> {
    validate_name(entry.name())?;
    match entry {
        SourceEntry::Folder { children, .. } => {
            let mut seen = FxHashSet::default();
            for child in children {
                let child_path = path.join(child.name());
                if !seen.insert(child.name()) {
                    return Err(SourceError::Collision(child_path));
                }
                validate_entry(child, &child_path)?;
            }
            Ok(())
        }
        leaf => check_leaf(path, leaf.kind(), leaf.bytes().unwrap_or_default()),
    }
}

/// Fail unless a leaf at `path` holding `bytes` reads back as `kind`.
fn check_leaf(path: &SourcePath, kind: SourceKind, bytes: &[u8]) -> Result<(), SourceError> {
    let name = path.file_name().unwrap_or_default();
    let stored = leaf_kind(name, bytes);
    if stored == kind {
        Ok(())
    } else {
        Err(SourceError::KindMismatch {
            path: path.clone(),
            kind,
            stored,
        })
    }
}
