//! `quire check`: load, save to a scratch location, reload, compare.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::config::QuireConfig;
use crate::log;
use crate::package;
use crate::source::{SourceEntry, SourcePath};

pub fn check(package_path: &Path, config: &QuireConfig) -> Result<()> {
    let document = super::open(package_path, config)?;
    let original = document.sources();

    let scratch = scratch_dir(package_path);
    let result = document
        .save(&scratch)
        .map_err(anyhow::Error::from)
        .and_then(|()| Ok(package::decode(&scratch)?));
    std::fs::remove_dir_all(&scratch).ok();
    let reloaded = result?.sources;

    let differences = diff(&original, &reloaded);
    if !differences.is_empty() {
        for line in &differences {
            log!("error"; "{}", line);
        }
        bail!("round-trip changed {} source(s)", differences.len());
    }

    log!("check"; "{}: {} source(s) round-trip unchanged", document.title(), flatten(&original).len());
    Ok(())
}

fn scratch_dir(package_path: &Path) -> PathBuf {
    let name = package_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    std::env::temp_dir().join(format!("quire-check-{}-{name}", std::process::id()))
}

fn flatten(entries: &[SourceEntry]) -> Vec<String> {
    let mut out: Vec<String> = entries
        .iter()
        .flat_map(|e| e.flatten(&SourcePath::root()))
        .map(|(path, kind, bytes)| {
            let hash = bytes.map(|b| crate::hash::ContentHash::of(&b).to_string());
            format!("{path} {} {}", kind.label(), hash.unwrap_or_default())
        })
        .collect();
    out.sort();
    out
}

/// Describe every (path, kind, content) triple present on only one side.
fn diff(before: &[SourceEntry], after: &[SourceEntry]) -> Vec<String> {
    let before = flatten(before);
    let after = flatten(after);
    let lost = before.iter().filter(|t| !after.contains(t)).map(|t| format!("lost: {t}"));
    let gained = after.iter().filter(|t| !before.contains(t)).map(|t| format!("gained: {t}"));
    lost.chain(gained).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{DocumentMetadata, PackageContents};
    use tempfile::TempDir;

    #[test]
    fn test_diff_reports_changes() {
        let a = vec![SourceEntry::text("main.typ", "Hello")];
        let b = vec![SourceEntry::opaque("main.typ", b"Hello".to_vec())];
        assert!(diff(&a, &a).is_empty());
        let d = diff(&a, &b);
        assert_eq!(d.len(), 2);
        assert!(d[0].starts_with("lost: /main.typ text"));
    }

    #[test]
    fn test_check_passes_for_valid_package() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Doc.quire");
        package::encode(
            &path,
            &PackageContents {
                sources: vec![
                    SourceEntry::text("main.typ", "Hello"),
                    SourceEntry::folder("assets", vec![SourceEntry::opaque("logo.png", vec![9u8; 4])]),
                ],
                metadata: DocumentMetadata::new(SourcePath::parse("/main.typ").unwrap()),
                preview: None,
                thumbnail: None,
            },
        )
        .unwrap();

        check(&path, &QuireConfig::default()).unwrap();
    }
}
