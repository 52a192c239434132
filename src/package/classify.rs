//! Classify on-disk entries into source entries.
//!
//! Tried in order, first match wins:
//!
//! | Variant | Accepts                                       |
//! |---------|-----------------------------------------------|
//! | Folder  | directories                                   |
//! | Image   | payload decodes as a supported bitmap         |
//! | Text    | `.typ` name and UTF-8 payload                 |
//! | Opaque  | anything else                                 |
//!
//! Opaque always succeeds, so a readable leaf is never rejected.

use std::fs;
use std::path::Path;

use super::PackageError;
use crate::source::{SourceEntry, SourceKind, is_valid_name, leaf_kind};

/// Read a directory into ordered entries (sorted by name).
///
/// Names that cannot be node names are skipped. That covers hidden entries
/// (`.DS_Store`, editor swap files), which the tree never creates.
pub fn read_folder(dir: &Path) -> Result<Vec<SourceEntry>, PackageError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(PackageError::io(dir))? {
        let entry = entry.map_err(PackageError::io(dir))?;
        let Ok(name) = entry.file_name().into_string() else {
            crate::debug!("package"; "skipping non UTF-8 name in {}", dir.display());
            continue;
        };
        if !is_valid_name(&name) {
            continue;
        }
        names.push(name);
    }
    names.sort();

    names
        .into_iter()
        .map(|name| {
            let path = dir.join(&name);
            // Follows symlinks: a linked folder is a folder
            let meta = fs::metadata(&path).map_err(PackageError::io(&path))?;
            if meta.is_dir() {
                return Ok(SourceEntry::folder(name, read_folder(&path)?));
            }
            let bytes = fs::read(&path).map_err(PackageError::io(&path))?;
            Ok(classify_leaf(name, bytes))
        })
        .collect()
}

/// Classify a leaf payload. Total.
pub fn classify_leaf(name: String, bytes: Vec<u8>) -> SourceEntry {
    match leaf_kind(&name, &bytes) {
        SourceKind::Image => SourceEntry::image(name, bytes),
        SourceKind::Text => match String::from_utf8(bytes) {
            Ok(text) => SourceEntry::text(name, text),
            Err(err) => SourceEntry::opaque(name, err.into_bytes()),
        },
        _ => SourceEntry::opaque(name, bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::sample_png;
    use tempfile::TempDir;

    #[test]
    fn test_classify_order() {
        assert_eq!(classify_leaf("logo.png".into(), sample_png()).kind(), SourceKind::Image);
        // An image wins even under a source name
        assert_eq!(classify_leaf("odd.typ".into(), sample_png()).kind(), SourceKind::Image);
        assert_eq!(classify_leaf("main.typ".into(), b"= Hi".to_vec()).kind(), SourceKind::Text);
        // Text needs the source extension
        assert_eq!(classify_leaf("notes.txt".into(), b"hi".to_vec()).kind(), SourceKind::Opaque);
        // and valid UTF-8
        assert_eq!(classify_leaf("bad.typ".into(), vec![0xff, 0xfe]).kind(), SourceKind::Opaque);
    }

    #[test]
    fn test_truncated_png_degrades_to_opaque() {
        let mut png = sample_png();
        png.truncate(20);
        let entry = classify_leaf("broken.png".into(), png.clone());
        assert_eq!(entry, SourceEntry::opaque("broken.png", png));
    }

    #[test]
    fn test_read_folder_sorted_and_skips_hidden() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.typ"), "b").unwrap();
        fs::write(dir.path().join("a.typ"), "a").unwrap();
        fs::write(dir.path().join(".DS_Store"), [0u8; 4]).unwrap();
        fs::create_dir(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/data.bin"), [1u8, 2, 3]).unwrap();

        let entries = read_folder(dir.path()).unwrap();
        assert_eq!(
            entries,
            vec![
                SourceEntry::text("a.typ", "a"),
                SourceEntry::folder("assets", vec![SourceEntry::opaque("data.bin", vec![1u8, 2, 3])]),
                SourceEntry::text("b.typ", "b"),
            ]
        );
    }
}
