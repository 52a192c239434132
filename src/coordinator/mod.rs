//! Compilation coordinator.
//!
//! Bridges the callback-driven [`Engine`] into awaitable operations:
//!
//! - `compile`: one shared result for every caller waiting when it arrives
//! - `highlight` / `autocomplete`: at most one waiter per source; a newer
//!   request resolves the older one with a neutral result (supersede)
//!
//! Supersession is the only cancellation. Callers that lose interest drop
//! the future; the late result is discarded.
//!
//! Lock order: `engine` may be held while taking `pending`, never the
//! reverse. The sink only ever takes `pending`, so an engine that reports
//! synchronously from inside `submit_*` cannot deadlock.

mod pending;
mod sink;
#[cfg(test)]
mod tests;
mod waiter;

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::watch;

pub use sink::CompletionSink;
pub use waiter::{Outcome, Ticket};

use pending::PendingRequests;
use waiter::{Tickets, Waiter};

use crate::engine::{
    CompileOutput, Diagnostic, Engine, EngineError, FileAccess, FontData, Highlighted, LineCol,
    Suggestion,
};
use crate::hash::ContentHash;
use crate::preview::{Preview, PreviewError};
use crate::source::{SourcePath, SourceTree};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    /// The engine rejected the document. Not a coordinator failure: the
    /// list is also published as the document's current diagnostics.
    #[error("compilation failed with {} diagnostic(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),

    /// The engine reported success but the artifact cannot be shown.
    #[error("compiled artifact cannot be rendered: {0}")]
    ArtifactDecode(#[from] PreviewError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine went away without reporting.
    #[error("engine stopped before reporting a result")]
    Interrupted,
}

impl CompileError {
    /// Diagnostics carried by this error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Diagnostics(list) => list,
            _ => &[],
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Owns the engine session of one document.
pub struct Coordinator {
    engine: Mutex<Box<dyn Engine>>,
    pending: Arc<Mutex<PendingRequests>>,
    tickets: Tickets,
    tree: Arc<RwLock<SourceTree>>,
    preview: watch::Sender<Option<Preview>>,
    diagnostics: watch::Sender<Vec<Diagnostic>>,
}

impl Coordinator {
    /// Connect `engine` to the document's files and take ownership of it.
    pub fn new(
        mut engine: Box<dyn Engine>,
        files: Arc<dyn FileAccess>,
        tree: Arc<RwLock<SourceTree>>,
    ) -> Self {
        let pending = Arc::new(Mutex::new(PendingRequests::default()));
        engine.connect(files, CompletionSink::new(Arc::clone(&pending)));

        Self {
            engine: Mutex::new(engine),
            pending,
            tickets: Tickets::default(),
            tree,
            preview: watch::Sender::new(None),
            diagnostics: watch::Sender::new(Vec::new()),
        }
    }

    /// Compile from `main`.
    ///
    /// Publishes diagnostics on every outcome and the preview on success
    /// when `update_preview` is set. A failed compile leaves the preview
    /// untouched.
    pub async fn compile(&self, main: &SourcePath, update_preview: bool) -> Result<Preview, CompileError> {
        let rx = {
            let mut engine = self.engine.lock();
            engine.set_main_entry(main)?;

            let (waiter, rx) = Waiter::new(self.tickets.next());
            let superseded = {
                let mut pending = self.pending.lock();
                pending.compile.push(waiter);
                pending.compile.len() - 1
            };
            if superseded > 0 {
                crate::debug!("coordinator"; "compile superseded {} pending request(s)", superseded);
            }

            engine.submit_compile();
            rx
        };

        match rx.await {
            Ok(Outcome::Done(output)) => self.apply_compile(output, update_preview),
            Ok(Outcome::Superseded) | Err(_) => Err(CompileError::Interrupted),
        }
    }

    /// Publish a preview loaded from a package cache.
    pub fn restore_preview(&self, preview: Preview) {
        self.preview.send_replace(Some(preview));
    }

    /// Record a compile failure that never reached the engine.
    pub fn fail_compile(&self, diagnostics: Vec<Diagnostic>) -> CompileError {
        self.diagnostics.send_replace(diagnostics.clone());
        CompileError::Diagnostics(diagnostics)
    }

    fn apply_compile(&self, output: CompileOutput, update_preview: bool) -> Result<Preview, CompileError> {
        match output {
            CompileOutput::Document { artifact, warnings } => {
                self.diagnostics.send_replace(warnings);
                let preview = Preview::decode(artifact)?;
                if update_preview {
                    self.preview.send_replace(Some(preview.clone()));
                }
                Ok(preview)
            }
            CompileOutput::Failed(diagnostics) => Err(self.fail_compile(diagnostics)),
        }
    }

    /// Highlight `text`, the current content of the source at `key`.
    ///
    /// Served from the node's cache when the text is unchanged. A superseded
    /// or interrupted request yields the neutral result.
    pub async fn highlight(&self, key: &SourcePath, text: &str) -> Highlighted {
        let text_hash = ContentHash::of(text.as_bytes());
        let cached = self.tree.read().cached_highlight(key, text_hash);
        if let Some(cached) = cached {
            return cached;
        }

        let rx = {
            let mut engine = self.engine.lock();
            let ticket = self.tickets.next();
            let (waiter, rx) = Waiter::new(ticket);
            let superseded = self.pending.lock().highlight.replace(key.clone(), waiter);
            if let Some(old) = superseded {
                crate::debug!("coordinator"; "highlight {} superseded by {} for {}", old.ticket(), ticket, key);
                old.supersede();
            }
            engine.submit_highlight(ticket, key, text);
            rx
        };

        match rx.await {
            Ok(Outcome::Done(result)) => {
                self.tree.write().store_highlight(key, text_hash, result.clone());
                result
            }
            Ok(Outcome::Superseded) | Err(_) => Highlighted::default(),
        }
    }

    /// Suggestions at `position` in the source at `key`.
    pub async fn autocomplete(&self, key: &SourcePath, position: LineCol) -> Vec<Suggestion> {
        let rx = {
            let mut engine = self.engine.lock();
            let ticket = self.tickets.next();
            let (waiter, rx) = Waiter::new(ticket);
            let superseded = self.pending.lock().autocomplete.replace(key.clone(), waiter);
            if let Some(old) = superseded {
                crate::debug!("coordinator"; "autocomplete {} superseded by {} for {}", old.ticket(), ticket, key);
                old.supersede();
            }
            engine.submit_autocomplete(ticket, key, position);
            rx
        };

        match rx.await {
            Ok(Outcome::Done(suggestions)) => suggestions,
            Ok(Outcome::Superseded) | Err(_) => Vec::new(),
        }
    }

    pub fn add_fonts(&self, fonts: impl IntoIterator<Item = FontData>) {
        let mut engine = self.engine.lock();
        for font in fonts {
            engine.add_font(font);
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn preview(&self) -> Option<Preview> {
        self.preview.borrow().clone()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn subscribe_preview(&self) -> watch::Receiver<Option<Preview>> {
        self.preview.subscribe()
    }

    pub fn subscribe_diagnostics(&self) -> watch::Receiver<Vec<Diagnostic>> {
        self.diagnostics.subscribe()
    }

    /// Number of requests still waiting on the engine.
    pub fn pending_count(&self) -> usize {
        let pending = self.pending.lock();
        pending.compile.len() + pending.highlight.len() + pending.autocomplete.len()
    }

    /// Engine callbacks dropped for lack of a waiter.
    pub fn orphan_count(&self) -> usize {
        self.pending.lock().orphans
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}
