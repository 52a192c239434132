//! Package codec: the on-disk form of a document.
//!
//! ```text
//! Thesis.quire/
//! ├── Sources/        # mirrors the source tree exactly
//! ├── Info.json       # DocumentMetadata
//! ├── preview.pdf     # optional, derived
//! └── cover.jpeg      # optional, derived
//! ```
//!
//! Saving writes a staging directory next to the target and swaps it in,
//! so a failed save leaves the previous package intact.

mod classify;
mod error;
mod metadata;
pub mod thumbnail;

use std::fs;
use std::path::{Path, PathBuf};

pub use classify::{classify_leaf, read_folder};
pub use error::PackageError;
pub use metadata::DocumentMetadata;

use crate::preview::Preview;
use crate::source::SourceEntry;

/// Folder holding the mirrored source tree.
pub const SOURCES_DIR: &str = "Sources";
pub const METADATA_FILE: &str = "Info.json";
pub const PREVIEW_FILE: &str = "preview.pdf";
pub const THUMBNAIL_FILE: &str = "cover.jpeg";
/// Directory extension of a package.
pub const PACKAGE_EXTENSION: &str = "quire";

/// Everything stored in a package.
#[derive(Debug, Clone)]
pub struct PackageContents {
    pub sources: Vec<SourceEntry>,
    pub metadata: DocumentMetadata,
    /// Cached preview. May be stale relative to the sources.
    pub preview: Option<Preview>,
    pub thumbnail: Option<Vec<u8>>,
}

/// Document title for a package path: its file stem.
pub fn title_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .to_string()
}

// =============================================================================
// Decoding
// =============================================================================

/// Load a package.
///
/// The metadata record and the sources folder are required. Cached
/// artifacts are loaded when valid and ignored otherwise.
pub fn decode(root: &Path) -> Result<PackageContents, PackageError> {
    if !root.is_dir() {
        return Err(PackageError::NotAPackage(root.to_path_buf()));
    }

    let metadata_path = root.join(METADATA_FILE);
    if !metadata_path.is_file() {
        return Err(PackageError::MissingMetadata(root.to_path_buf()));
    }
    let raw = fs::read(&metadata_path).map_err(PackageError::io(&metadata_path))?;
    let (metadata, ignored) =
        DocumentMetadata::from_json(&raw).map_err(|source| PackageError::CorruptMetadata {
            path: metadata_path.clone(),
            source,
        })?;
    for key in ignored {
        crate::debug!("package"; "ignoring unknown metadata key `{}`", key);
    }

    let sources_dir = root.join(SOURCES_DIR);
    if !sources_dir.is_dir() {
        return Err(PackageError::MissingSources(root.to_path_buf()));
    }
    let sources = read_folder(&sources_dir)?;

    let preview = load_preview(&root.join(PREVIEW_FILE));
    let thumbnail = fs::read(root.join(THUMBNAIL_FILE)).ok();

    crate::debug!("package"; "loaded {} with {} root source(s)", root.display(), sources.len());
    Ok(PackageContents {
        sources,
        metadata,
        preview,
        thumbnail,
    })
}

fn load_preview(path: &Path) -> Option<Preview> {
    let bytes = fs::read(path).ok()?;
    match Preview::decode(bytes.into()) {
        Ok(preview) => Some(preview),
        Err(e) => {
            crate::debug!("package"; "ignoring cached preview {}: {}", path.display(), e);
            None
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Save a package to `root`, replacing whatever is there.
pub fn encode(root: &Path, contents: &PackageContents) -> Result<(), PackageError> {
    let staging = sibling(root, "staging");
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(PackageError::io(&staging))?;
    }

    let written = write_package(&staging, contents);
    if let Err(e) = written {
        fs::remove_dir_all(&staging).ok();
        return Err(e);
    }

    swap_in(&staging, root)
}

fn write_package(dir: &Path, contents: &PackageContents) -> Result<(), PackageError> {
    let sources_dir = dir.join(SOURCES_DIR);
    fs::create_dir_all(&sources_dir).map_err(PackageError::io(&sources_dir))?;
    for entry in &contents.sources {
        write_entry(&sources_dir, entry)?;
    }

    let metadata_path = dir.join(METADATA_FILE);
    let json = contents
        .metadata
        .to_json()
        .map_err(|source| PackageError::CorruptMetadata {
            path: metadata_path.clone(),
            source,
        })?;
    fs::write(&metadata_path, json).map_err(PackageError::io(&metadata_path))?;

    // Derived artifacts never fail a save
    if let Some(preview) = &contents.preview
        && let Err(e) = fs::write(dir.join(PREVIEW_FILE), preview.bytes())
    {
        crate::log!("warning"; "failed to write cached preview: {}", e);
    }
    if let Some(thumbnail) = &contents.thumbnail
        && let Err(e) = fs::write(dir.join(THUMBNAIL_FILE), thumbnail)
    {
        crate::log!("warning"; "failed to write thumbnail: {}", e);
    }
    Ok(())
}

fn write_entry(dir: &Path, entry: &SourceEntry) -> Result<(), PackageError> {
    let path = dir.join(entry.name());
    match entry {
        SourceEntry::Folder { children, .. } => {
            fs::create_dir(&path).map_err(PackageError::io(&path))?;
            for child in children {
                write_entry(&path, child)?;
            }
            Ok(())
        }
        SourceEntry::Text { text, .. } => fs::write(&path, text).map_err(PackageError::io(&path)),
        SourceEntry::Image { bytes, .. } | SourceEntry::Opaque { bytes, .. } => {
            fs::write(&path, bytes).map_err(PackageError::io(&path))
        }
    }
}

/// Replace `target` with `staging`, keeping the old package until the new
/// one is in place.
fn swap_in(staging: &Path, target: &Path) -> Result<(), PackageError> {
    if !target.exists() {
        return fs::rename(staging, target).map_err(PackageError::io(target));
    }
    if !target.is_dir() {
        fs::remove_dir_all(staging).ok();
        return Err(PackageError::NotAPackage(target.to_path_buf()));
    }

    let backup = sibling(target, "old");
    if backup.exists() {
        fs::remove_dir_all(&backup).map_err(PackageError::io(&backup))?;
    }
    fs::rename(target, &backup).map_err(PackageError::io(target))?;
    if let Err(e) = fs::rename(staging, target) {
        // Put the previous package back
        fs::rename(&backup, target).ok();
        return Err(PackageError::Io(target.to_path_buf(), e));
    }
    fs::remove_dir_all(&backup).map_err(PackageError::io(&backup))
}

/// Hidden path next to `path`: `.Thesis.quire.<suffix>`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{suffix}"))
}

/// Create a new package at `root`. Fails if anything already exists there.
pub fn create(root: &Path, contents: &PackageContents) -> Result<(), PackageError> {
    if root.exists() {
        return Err(PackageError::AlreadyExists(root.to_path_buf()));
    }
    encode(root, contents)
}
