//! File access for the engine.
//!
//! Plain paths read the source tree. `@namespace/name:version/...` paths go
//! to an in-memory package cache owned by the document, separate from the
//! tree.
//!
//! The engine may address sources relative to the package root
//! (`Sources/chapters/intro.typ`). Such a path falls back to the tree path
//! without the `Sources` prefix, but only when the path as written does not
//! resolve, so a root folder named `Sources` still wins.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::engine::{FileAccess, FileError, PackageSpec};
use crate::package::SOURCES_DIR;
use crate::source::{SourceError, SourcePath, SourceTree};

type PackageFiles = FxHashMap<String, Vec<u8>>;

pub struct DocumentFiles {
    tree: Arc<RwLock<SourceTree>>,
    packages: RwLock<FxHashMap<PackageSpec, PackageFiles>>,
}

impl DocumentFiles {
    pub fn new(tree: Arc<RwLock<SourceTree>>) -> Self {
        Self {
            tree,
            packages: RwLock::new(FxHashMap::default()),
        }
    }

    /// Packages currently cached.
    pub fn cached_packages(&self) -> Vec<PackageSpec> {
        let mut specs: Vec<_> = self.packages.read().keys().cloned().collect();
        specs.sort();
        specs
    }

    fn read_package(&self, spec: &PackageSpec, inner: &str) -> Result<Vec<u8>, FileError> {
        let packages = self.packages.read();
        let files = packages
            .get(spec)
            .ok_or_else(|| FileError::PackageMissing(spec.clone()))?;
        if let Some(bytes) = files.get(inner) {
            return Ok(bytes.clone());
        }
        if inner.is_empty() || files.keys().any(|f| f.starts_with(&format!("{inner}/"))) {
            return Err(FileError::IsDirectory(format!("{spec}/{inner}")));
        }
        Err(FileError::NotFound(format!("{spec}/{inner}")))
    }

    /// Tree path an engine path refers to.
    fn source_path(&self, path: &str) -> Option<SourcePath> {
        let source = SourcePath::parse(path).ok()?;
        let tree = self.tree.read();
        if tree.contains(&source) {
            return Some(source);
        }

        {
            let mut components = source.components();
            if components.next() == Some(SOURCES_DIR)
                && let Ok(rest) = SourcePath::from_components(components)
                && !rest.is_root()
                && tree.contains(&rest)
            {
                return Some(rest);
            }
        }
        Some(source)
    }
}

impl FileAccess for DocumentFiles {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, FileError> {
        if let Some((spec, inner)) = PackageSpec::split_path(path) {
            return self.read_package(&spec, inner);
        }

        let source = self
            .source_path(path)
            .ok_or_else(|| FileError::InvalidPath(path.to_string()))?;
        self.tree.read().read(&source).map_err(|e| match e {
            SourceError::IsAFolder(_) => FileError::IsDirectory(path.to_string()),
            _ => FileError::NotFound(path.to_string()),
        })
    }

    fn file_exists(&self, path: &str) -> bool {
        if let Some((spec, inner)) = PackageSpec::split_path(path) {
            return self
                .packages
                .read()
                .get(&spec)
                .is_some_and(|files| files.contains_key(inner));
        }
        self.source_path(path)
            .is_some_and(|source| self.tree.read().contains(&source))
    }

    fn write_file(&self, path: &str, bytes: &[u8]) -> Result<(), FileError> {
        let Some((spec, inner)) = PackageSpec::split_path(path) else {
            return Err(FileError::ReadOnly(path.to_string()));
        };
        if inner.is_empty() || inner.split('/').any(|c| c.is_empty() || c == "..") {
            return Err(FileError::InvalidPath(path.to_string()));
        }
        self.packages
            .write()
            .entry(spec)
            .or_default()
            .insert(inner.to_string(), bytes.to_vec());
        Ok(())
    }

    fn list_directory(&self, package: &PackageSpec) -> Result<Vec<String>, FileError> {
        let packages = self.packages.read();
        let files = packages
            .get(package)
            .ok_or_else(|| FileError::PackageMissing(package.clone()))?;
        let mut names: Vec<_> = files.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn create_directory(&self, package: &PackageSpec) -> Result<(), FileError> {
        self.packages.write().entry(package.clone()).or_default();
        Ok(())
    }
}
