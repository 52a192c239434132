//! Font discovery for the engine.
//!
//! Best-effort: unreadable directories and files are skipped, never fatal.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::WalkDir;

use crate::engine::FontData;

const FONT_EXTENSIONS: [&str; 4] = ["ttf", "otf", "ttc", "otc"];

/// Collect every font file below `dirs`, sorted by path.
pub fn discover(dirs: &[PathBuf]) -> Vec<FontData> {
    let mut paths: Vec<PathBuf> = dirs
        .iter()
        .filter(|dir| {
            let ok = dir.is_dir();
            if !ok {
                crate::debug!("fonts"; "skipping missing font directory {}", dir.display());
            }
            ok
        })
        .flat_map(|dir| {
            WalkDir::new(dir)
                .skip_hidden(false)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
                .map(|entry| entry.path())
                .filter(|path| is_font(path))
                .collect::<Vec<_>>()
        })
        .collect();
    paths.sort();
    paths.dedup();

    paths.iter().filter_map(|path| load(path)).collect()
}

fn is_font(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| FONT_EXTENSIONS.iter().any(|f| ext.eq_ignore_ascii_case(f)))
}

fn load(path: &Path) -> Option<FontData> {
    match fs::read(path) {
        Ok(bytes) => Some(FontData {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            bytes: Arc::from(bytes),
        }),
        Err(e) => {
            crate::log!("fonts"; "skipping {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("Serif.TTF"), b"ttf").unwrap();
        fs::write(dir.path().join("sub/Mono.otf"), b"otf").unwrap();
        fs::write(dir.path().join("readme.txt"), b"no").unwrap();

        let fonts = discover(&[dir.path().to_path_buf(), dir.path().join("missing")]);
        let names: Vec<_> = fonts.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Serif.TTF", "Mono.otf"]);
        assert_eq!(&*fonts[1].bytes, b"otf");
    }
}
