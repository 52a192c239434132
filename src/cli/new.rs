//! `quire new`

use std::path::Path;

use anyhow::{Result, bail};

use crate::config::QuireConfig;
use crate::document::{DEFAULT_MAIN, Document};
use crate::engine::DetachedEngine;
use crate::log;
use crate::package;
use crate::source::SourcePath;

pub fn new_package(path: &Path, empty: bool, config: &QuireConfig) -> Result<()> {
    if path.exists() {
        bail!("`{}` already exists", path.display());
    }

    let mut options = config.document_options();
    options.watch = false;
    let document = Document::new(package::title_of(path), Box::new(DetachedEngine::new()), options);
    if empty {
        document.set_text(&SourcePath::root().join(DEFAULT_MAIN), "")?;
    }
    document.save(path)?;

    log!("new"; "created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceEntry;
    use tempfile::TempDir;

    #[test]
    fn test_new_package() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Thesis.quire");
        new_package(&path, false, &QuireConfig::default()).unwrap();

        let contents = package::decode(&path).unwrap();
        assert_eq!(contents.sources, vec![SourceEntry::text("main.typ", "Hello, Quire.")]);
        assert_eq!(contents.metadata.main_source.to_string(), "/main.typ");

        assert!(new_package(&path, false, &QuireConfig::default()).is_err());
    }

    #[test]
    fn test_new_empty_package() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Blank.quire");
        new_package(&path, true, &QuireConfig::default()).unwrap();
        let contents = package::decode(&path).unwrap();
        assert_eq!(contents.sources, vec![SourceEntry::text("main.typ", "")]);
    }
}
