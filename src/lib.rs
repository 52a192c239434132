//! Quire - a document model for Typst writing apps.
//!
//! A document is a tree of sources stored in a `.quire` package. The
//! [`Document`](document::Document) owns that tree, persists it, and drives
//! an external typesetting [`Engine`](engine::Engine) through the
//! [`Coordinator`](coordinator::Coordinator), which turns the engine's
//! completion callbacks into awaitable results.
//!
//! # Module Structure
//!
//! ```text
//! source/       # SourceTree, SourcePath, SourceEntry
//! package/      # on-disk codec, metadata, thumbnails
//! engine/       # Engine trait and value types
//! coordinator/  # request/response bridging, supersession
//! document/     # Document facade, engine file access, fonts
//! watcher/      # debounced recompilation after edits
//! config/       # quire.toml
//! cli/          # `quire` command line
//! ```

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod document;
pub mod engine;
pub mod hash;
pub mod logger;
pub mod package;
pub mod preview;
pub mod source;
pub mod watcher;
