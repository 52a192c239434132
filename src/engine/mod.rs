//! Engine interface.
//!
//! The compiler/analysis engine is an external collaborator. It is driven
//! through [`Engine`] and reports results asynchronously through the
//! [`CompletionSink`] it receives in [`Engine::connect`]. While working it
//! reads the document through [`FileAccess`].
//!
//! ```text
//! Coordinator --submit_*--> Engine --read_file--> FileAccess (document)
//!      ^                      |
//!      +---- CompletionSink <-+
//! ```

mod detached;
#[cfg(test)]
pub(crate) mod scripted;
mod types;

use std::sync::Arc;

use thiserror::Error;

pub use crate::coordinator::{CompletionSink, Ticket};
pub use detached::DetachedEngine;
pub use types::{
    Completion, CompileOutput, Diagnostic, FontData, HighlightSpan, Highlighted, LineCol,
    PackageSpec, Severity, Suggestion, SuggestionKind, filter_suggestions,
};

use crate::source::SourcePath;

/// Errors the engine reports synchronously.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine rejected main entry `{0}`: {1}")]
    MainEntry(SourcePath, String),

    #[error("engine failure: {0}")]
    Other(String),
}

/// Errors returned to the engine by file-access callbacks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FileError {
    #[error("`{0}` not found among the document's sources")]
    NotFound(String),

    #[error("`{0}` is a directory")]
    IsDirectory(String),

    #[error("invalid path `{0}`")]
    InvalidPath(String),

    #[error("`{0}` is a document source and cannot be written by the engine")]
    ReadOnly(String),

    #[error("package `{0}` is not in the cache")]
    PackageMissing(PackageSpec),
}

/// A single long-lived compiler/analysis session.
///
/// Implementations are not expected to be re-entrant: the coordinator never
/// calls two methods concurrently. Results may be delivered to the sink from
/// any thread, including synchronously from inside a `submit_*` call.
pub trait Engine: Send + 'static {
    /// Hand the engine its document file access and completion sink.
    /// Called exactly once, before any other method.
    fn connect(&mut self, files: Arc<dyn FileAccess>, sink: CompletionSink);

    fn set_main_entry(&mut self, path: &SourcePath) -> Result<(), EngineError>;

    /// Compile from the main entry; reports via `CompletionSink::compile_finished`.
    fn submit_compile(&mut self);

    /// Highlight `text`, the current buffer of the source at `path`.
    /// The result must be reported with the same `ticket`.
    fn submit_highlight(&mut self, ticket: Ticket, path: &SourcePath, text: &str);

    fn submit_autocomplete(&mut self, ticket: Ticket, path: &SourcePath, position: LineCol);

    fn add_font(&mut self, font: FontData);
}

/// File-access callbacks the engine invokes synchronously.
///
/// Plain paths address the source tree. Paths starting with
/// `@namespace/name:version` address the auxiliary package cache.
pub trait FileAccess: Send + Sync {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, FileError>;

    fn file_exists(&self, path: &str) -> bool;

    fn write_file(&self, path: &str, bytes: &[u8]) -> Result<(), FileError>;

    /// Files stored for a cached package, relative to the package root.
    fn list_directory(&self, package: &PackageSpec) -> Result<Vec<String>, FileError>;

    fn create_directory(&self, package: &PackageSpec) -> Result<(), FileError>;
}
