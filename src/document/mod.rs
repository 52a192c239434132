//! The open document.
//!
//! A [`Document`] owns the source tree, its metadata, and the single
//! engine session (through the [`Coordinator`]). Every tree mutation goes
//! through it so observers and the change watcher hear about it.
//!
//! Locks: the tree is a `RwLock`. Mutations take it for writing, saving
//! takes it for reading, so a save always sees a consistent tree. No lock
//! is held across an await.

mod files;
mod fonts;

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, watch};

pub use files::DocumentFiles;
pub use fonts::discover as discover_fonts;

use crate::coordinator::{CompileError, Coordinator};
use crate::engine::{Diagnostic, Engine, Highlighted, LineCol, Suggestion};
use crate::package::thumbnail::{self, PageRenderer, ThumbnailOptions};
use crate::package::{self, DocumentMetadata, PackageContents, PackageError};
use crate::preview::Preview;
use crate::source::{
    NodeId, SOURCE_EXTENSION, SourceEntry, SourceError, SourceKind, SourcePath, SourceTree,
};
use crate::watcher::{self, ChangeKind, NodeChange, RecompileTarget};

/// Name and content of the single source in a new document.
pub const DEFAULT_MAIN: &str = "main.typ";
pub const DEFAULT_TEXT: &str = "Hello, Quire.";

const CHANGE_CAPACITY: usize = 256;

// =============================================================================
// Options
// =============================================================================

/// Per-document behaviour, usually built from `quire.toml`.
#[derive(Clone)]
pub struct DocumentOptions {
    /// Recompile automatically after edits.
    pub watch: bool,
    pub debounce: Duration,
    /// Fonts handed to the engine on first compile.
    pub font_dirs: Vec<PathBuf>,
    /// Write `cover.jpeg` on save (needs `renderer`).
    pub thumbnail: bool,
    pub thumbnail_options: ThumbnailOptions,
    pub renderer: Option<Arc<dyn PageRenderer>>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            watch: true,
            debounce: Duration::from_millis(watcher::DEBOUNCE_MS),
            font_dirs: Vec::new(),
            thumbnail: true,
            thumbnail_options: ThumbnailOptions::default(),
            renderer: None,
        }
    }
}

impl std::fmt::Debug for DocumentOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentOptions")
            .field("watch", &self.watch)
            .field("debounce", &self.debounce)
            .field("font_dirs", &self.font_dirs)
            .field("thumbnail", &self.thumbnail)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

// =============================================================================
// Document
// =============================================================================

pub struct Document {
    shared: Arc<Shared>,
}

/// State shared with the watcher task.
struct Shared {
    title: String,
    tree: Arc<RwLock<SourceTree>>,
    metadata: RwLock<DocumentMetadata>,
    coordinator: Coordinator,
    files: Arc<DocumentFiles>,
    thumbnail: RwLock<Option<Vec<u8>>>,
    /// Number of fonts handed to the engine; set once.
    fonts: OnceLock<usize>,
    options: DocumentOptions,
    changes: broadcast::Sender<NodeChange>,
    watch_tx: Option<mpsc::UnboundedSender<NodeChange>>,
}

impl Document {
    /// A new document with a single `main.typ`.
    pub fn new(title: impl Into<String>, engine: Box<dyn Engine>, options: DocumentOptions) -> Self {
        let tree = SourceTree::from_entries([SourceEntry::text(DEFAULT_MAIN, DEFAULT_TEXT)]).unwrap_or_default();
        let metadata = DocumentMetadata::new(SourcePath::root().join(DEFAULT_MAIN));
        Self::from_tree(title, tree, metadata, engine, options)
    }

    /// Load the package at `path`.
    pub fn open(path: &Path, engine: Box<dyn Engine>, options: DocumentOptions) -> Result<Self, PackageError> {
        let contents = package::decode(path)?;
        let document = Self::from_contents(package::title_of(path), contents, engine, options)?;
        crate::log!("package"; "opened {} ({} sources)", document.title(), document.len());
        Ok(document)
    }

    pub fn from_contents(
        title: impl Into<String>,
        contents: PackageContents,
        engine: Box<dyn Engine>,
        options: DocumentOptions,
    ) -> Result<Self, SourceError> {
        let tree = SourceTree::from_entries(contents.sources)?;
        let document = Self::from_tree(title, tree, contents.metadata, engine, options);
        if let Some(preview) = contents.preview {
            document.shared.coordinator.restore_preview(preview);
        }
        *document.shared.thumbnail.write() = contents.thumbnail;
        Ok(document)
    }

    fn from_tree(
        title: impl Into<String>,
        tree: SourceTree,
        metadata: DocumentMetadata,
        engine: Box<dyn Engine>,
        options: DocumentOptions,
    ) -> Self {
        let tree = Arc::new(RwLock::new(tree));
        let files = Arc::new(DocumentFiles::new(Arc::clone(&tree)));
        let coordinator = Coordinator::new(engine, files.clone(), Arc::clone(&tree));
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);

        // The watcher needs a runtime; without one edits only notify observers
        let in_runtime = tokio::runtime::Handle::try_current().is_ok();
        let (watch_tx, watch_rx) = if in_runtime && options.watch {
            let (tx, rx) = mpsc::unbounded_channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        let debounce = options.debounce;

        let shared = Arc::new(Shared {
            title: title.into(),
            tree,
            metadata: RwLock::new(metadata),
            coordinator,
            files,
            thumbnail: RwLock::new(None),
            fonts: OnceLock::new(),
            options,
            changes,
            watch_tx,
        });

        if let Some(rx) = watch_rx {
            watcher::spawn(rx, Arc::downgrade(&shared), debounce);
        }

        Self { shared }
    }

    /// Save to `path`, replacing any package there.
    ///
    /// The cached preview and thumbnail are refreshed best-effort.
    pub fn save(&self, path: &Path) -> Result<(), PackageError> {
        let preview = self.shared.coordinator.preview();
        if let Some(preview) = &preview {
            self.refresh_thumbnail(preview);
        }

        let contents = {
            let tree = self.shared.tree.read();
            PackageContents {
                sources: tree.snapshot(),
                metadata: self.shared.metadata.read().clone(),
                preview,
                thumbnail: self.shared.thumbnail.read().clone(),
            }
        };
        package::encode(path, &contents)?;
        crate::debug!("package"; "saved {}", path.display());
        Ok(())
    }

    fn refresh_thumbnail(&self, preview: &Preview) {
        let options = &self.shared.options;
        if !options.thumbnail {
            return;
        }
        let Some(renderer) = &options.renderer else {
            return;
        };
        if let Some(jpeg) = thumbnail::render(renderer.as_ref(), preview, options.thumbnail_options) {
            *self.shared.thumbnail.write() = Some(jpeg);
        }
    }

    // =========================================================================
    // Reading
    // =========================================================================

    pub fn title(&self) -> &str {
        &self.shared.title
    }

    pub fn metadata(&self) -> DocumentMetadata {
        self.shared.metadata.read().clone()
    }

    /// Detached copy of the source forest, in display order.
    pub fn sources(&self) -> Vec<SourceEntry> {
        self.shared.tree.read().snapshot()
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.shared.tree.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.tree.read().is_empty()
    }

    pub fn resolve(&self, path: &SourcePath) -> Option<NodeId> {
        self.shared.tree.read().resolve(path)
    }

    /// Run `f` against the tree under a read lock.
    pub fn with_tree<R>(&self, f: impl FnOnce(&SourceTree) -> R) -> R {
        f(&self.shared.tree.read())
    }

    /// Text of the source at `path`.
    pub fn text(&self, path: &SourcePath) -> Result<String, SourceError> {
        let tree = self.shared.tree.read();
        let id = tree.resolve(path).ok_or_else(|| SourceError::NotFound(path.clone()))?;
        tree.node(id)?
            .text()
            .map(str::to_string)
            .ok_or_else(|| SourceError::NotText(path.clone()))
    }

    pub fn thumbnail(&self) -> Option<Vec<u8>> {
        self.shared.thumbnail.read().clone()
    }

    pub fn files(&self) -> Arc<DocumentFiles> {
        Arc::clone(&self.shared.files)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Add `entry` under the folder at `into` (or at the root).
    pub fn add_source(&self, entry: SourceEntry, into: Option<&SourcePath>) -> Result<SourcePath, SourceError> {
        self.insert_with(entry, into, SourceTree::insert)
    }

    /// Add `entry` under an auto-generated `untitled` name.
    pub fn add_untitled(&self, entry: SourceEntry, into: Option<&SourcePath>) -> Result<SourcePath, SourceError> {
        self.insert_with(entry, into, SourceTree::insert_untitled)
    }

    fn insert_with(
        &self,
        entry: SourceEntry,
        into: Option<&SourcePath>,
        insert: impl FnOnce(&mut SourceTree, SourceEntry, Option<NodeId>) -> Result<NodeId, SourceError>,
    ) -> Result<SourcePath, SourceError> {
        let created = {
            let mut tree = self.shared.tree.write();
            let folder = into.map(|path| resolve_in(&tree, path)).transpose()?;
            let id = insert(&mut tree, entry, folder)?;
            let path = tree.path(id)?;
            let mut created = Vec::new();
            collect_paths(&tree, id, &mut created);
            (path, created)
        };

        let (path, created) = created;
        for child in created {
            self.shared.emit(NodeChange::new(child, ChangeKind::Created));
        }
        Ok(path)
    }

    /// Rename the node at `path`. Returns its new path.
    ///
    /// Metadata pointing into the renamed node follows it.
    pub fn rename(&self, path: &SourcePath, new_name: &str) -> Result<SourcePath, SourceError> {
        let (old_paths, new_path, new_paths) = {
            let mut tree = self.shared.tree.write();
            let id = resolve_in(&tree, path)?;
            let mut old_paths = Vec::new();
            collect_paths(&tree, id, &mut old_paths);
            tree.rename(id, new_name)?;
            let mut new_paths = Vec::new();
            collect_paths(&tree, id, &mut new_paths);
            (old_paths, tree.path(id)?, new_paths)
        };

        if new_path == *path {
            return Ok(new_path);
        }
        self.shared.metadata.write().follow_rename(path, &new_path);

        for old in old_paths {
            self.shared.emit(NodeChange::new(old, ChangeKind::Removed));
        }
        for new in new_paths {
            self.shared.emit(NodeChange::new(new, ChangeKind::Created));
        }
        Ok(new_path)
    }

    /// Remove the node at `path` and its subtree.
    pub fn remove(&self, path: &SourcePath) -> Result<SourceEntry, SourceError> {
        let (entry, removed) = {
            let mut tree = self.shared.tree.write();
            let id = resolve_in(&tree, path)?;
            let mut removed = Vec::new();
            collect_paths(&tree, id, &mut removed);
            (tree.remove(id)?, removed)
        };

        {
            let mut metadata = self.shared.metadata.write();
            if metadata
                .last_opened_source
                .as_ref()
                .is_some_and(|p| p.starts_with(path))
            {
                metadata.last_opened_source = None;
                metadata.last_edited_line = None;
            }
        }

        for path in removed {
            self.shared.emit(NodeChange::new(path, ChangeKind::Removed));
        }
        Ok(entry)
    }

    pub fn set_text(&self, path: &SourcePath, text: impl Into<String>) -> Result<(), SourceError> {
        {
            let mut tree = self.shared.tree.write();
            let id = resolve_in(&tree, path)?;
            tree.set_text(id, text)?;
        }
        self.shared.emit(NodeChange::new(path.clone(), ChangeKind::Modified));
        Ok(())
    }

    pub fn set_bytes(&self, path: &SourcePath, bytes: Vec<u8>) -> Result<(), SourceError> {
        {
            let mut tree = self.shared.tree.write();
            let id = resolve_in(&tree, path)?;
            tree.set_bytes(id, bytes)?;
        }
        self.shared.emit(NodeChange::new(path.clone(), ChangeKind::Modified));
        Ok(())
    }

    /// Make the text source at `path` the compile entry point.
    pub fn set_main_source(&self, path: &SourcePath) -> Result<(), SourceError> {
        {
            let tree = self.shared.tree.read();
            let id = resolve_in(&tree, path)?;
            if tree.node(id)?.kind() != SourceKind::Text {
                return Err(SourceError::NotText(path.clone()));
            }
        }
        self.shared.metadata.write().main_source = path.clone();
        self.shared.emit(NodeChange::new(path.clone(), ChangeKind::Modified));
        Ok(())
    }

    /// Remember where the user was editing.
    pub fn set_last_opened(&self, path: &SourcePath, line: Option<u32>) -> Result<(), SourceError> {
        if !self.shared.tree.read().contains(path) {
            return Err(SourceError::NotFound(path.clone()));
        }
        let mut metadata = self.shared.metadata.write();
        metadata.last_opened_source = Some(path.clone());
        metadata.last_edited_line = line;
        Ok(())
    }

    // =========================================================================
    // Engine operations
    // =========================================================================

    /// Compile from the main source.
    pub async fn compile(&self, update_preview: bool) -> Result<Preview, CompileError> {
        self.shared.compile(update_preview).await
    }

    pub async fn highlight(&self, path: &SourcePath, text: &str) -> Highlighted {
        self.shared.coordinator.highlight(path, text).await
    }

    pub async fn autocomplete(&self, path: &SourcePath, position: LineCol) -> Vec<Suggestion> {
        self.shared.coordinator.autocomplete(path, position).await
    }

    /// Discover fonts in the configured directories and hand them to the
    /// engine. Runs once per document; later calls return the first count.
    pub fn load_fonts(&self) -> usize {
        self.shared.load_fonts()
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn subscribe_changes(&self) -> broadcast::Receiver<NodeChange> {
        self.shared.changes.subscribe()
    }

    pub fn preview(&self) -> watch::Receiver<Option<Preview>> {
        self.shared.coordinator.subscribe_preview()
    }

    pub fn diagnostics(&self) -> watch::Receiver<Vec<Diagnostic>> {
        self.shared.coordinator.subscribe_diagnostics()
    }

    pub fn current_preview(&self) -> Option<Preview> {
        self.shared.coordinator.preview()
    }

    pub fn current_diagnostics(&self) -> Vec<Diagnostic> {
        self.shared.coordinator.diagnostics()
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.shared.coordinator
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("title", &self.shared.title)
            .field("metadata", &*self.shared.metadata.read())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn emit(&self, change: NodeChange) {
        // No receivers is fine
        let _ = self.changes.send(change.clone());
        if let Some(tx) = &self.watch_tx {
            let _ = tx.send(change);
        }
    }

    fn load_fonts(&self) -> usize {
        *self.fonts.get_or_init(|| {
            let fonts = fonts::discover(&self.options.font_dirs);
            let count = fonts.len();
            self.coordinator.add_fonts(fonts);
            if count > 0 {
                crate::debug!("fonts"; "loaded {} font(s)", count);
            }
            count
        })
    }

    async fn compile(&self, update_preview: bool) -> Result<Preview, CompileError> {
        self.load_fonts();

        let main = self.metadata.read().main_source.clone();
        if let Some(diagnostic) = self.check_main(&main) {
            return Err(self.coordinator.fail_compile(vec![diagnostic]));
        }
        self.coordinator.compile(&main, update_preview).await
    }

    /// Diagnose a main source the engine could not start from.
    fn check_main(&self, main: &SourcePath) -> Option<Diagnostic> {
        let tree = self.tree.read();
        let kind = tree.resolve(main).and_then(|id| tree.get(id)).map(|node| node.kind());
        match kind {
            Some(SourceKind::Text) => None,
            Some(kind) => Some(
                Diagnostic::error(format!("main source `{main}` is a {}, not a text source", kind.label()))
                    .at(main.clone(), None),
            ),
            None => {
                let mut diagnostic = Diagnostic::error(format!("main source `{main}` does not exist"))
                    .at(main.clone(), None);
                if let Some(candidate) = tree
                    .text_sources()
                    .into_iter()
                    .find(|p| p.extension() == Some(SOURCE_EXTENSION))
                {
                    diagnostic = diagnostic.with_hint(format!("set the main source, e.g. to `{candidate}`"));
                }
                Some(diagnostic)
            }
        }
    }
}

impl RecompileTarget for Shared {
    fn is_attached(&self, path: &SourcePath) -> bool {
        self.tree.read().contains(path)
    }

    async fn recompile(&self) {
        // Errors already live in the published diagnostics
        match self.compile(true).await {
            Ok(preview) => crate::debug!("watch"; "recompiled {} ({} pages)", self.title, preview.page_count()),
            Err(e) => crate::debug!("watch"; "recompile of {} failed: {}", self.title, e),
        }
    }
}

fn resolve_in(tree: &SourceTree, path: &SourcePath) -> Result<NodeId, SourceError> {
    tree.resolve(path).ok_or_else(|| SourceError::NotFound(path.clone()))
}

/// Paths of `id` and its descendants, preorder.
fn collect_paths(tree: &SourceTree, id: NodeId, out: &mut Vec<SourcePath>) {
    let Ok(path) = tree.path(id) else {
        return;
    };
    out.push(path);
    if let Some(node) = tree.get(id) {
        for &child in node.children() {
            collect_paths(tree, child, out);
        }
    }
}
