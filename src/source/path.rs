//! Root-relative source paths.
//!
//! A [`SourcePath`] is the identity of a node in the source tree: the
//! sequence of names from a root-level entry down to the node. It is always
//! derived from the tree, never stored on nodes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::SourceError;

/// Check if a string is usable as a single node name.
///
/// Disallows the empty string, slashes, NUL bytes and a leading `.`. Dot
/// names are hidden on disk and never read back from a package.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\0'])
}

/// Validate a node name, returning it as an owned string.
pub fn validate_name(name: &str) -> Result<String, SourceError> {
    if is_valid_name(name) {
        Ok(name.to_string())
    } else {
        Err(SourceError::InvalidName(name.to_string()))
    }
}

/// A root-relative sequence of validated names, displayed as `/a/b.typ`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePath {
    components: Vec<String>,
}

impl SourcePath {
    /// The empty path (the tree root itself).
    pub const fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Parse a path as written by users, metadata records or the engine.
    ///
    /// Accepts `/a/b`, `a/b` and `./a/b`. Every component is kept as
    /// written, so a root folder named `Sources` stays addressable.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let mut components = Vec::new();
        for part in raw.split('/') {
            match part {
                "" | "." => continue,
                ".." => return Err(SourceError::InvalidPath(raw.to_string())),
                part if part.contains('\0') => {
                    return Err(SourceError::InvalidPath(raw.to_string()));
                }
                part => components.push(part.to_string()),
            }
        }
        Ok(Self { components })
    }

    pub fn from_components<I, S>(components: I) -> Result<Self, SourceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        components
            .into_iter()
            .map(|c| validate_name(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(|components| Self { components })
    }

    /// Append a name, returning the child path.
    pub fn join(&self, name: &str) -> Self {
        let mut components = self.components.clone();
        components.push(name.to_string());
        Self { components }
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.components.split_last()?;
        Some(Self {
            components: rest.to_vec(),
        })
    }

    /// Final component.
    pub fn file_name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Extension of the final component, without the dot.
    pub fn extension(&self) -> Option<&str> {
        extension_of(self.file_name()?)
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.components.len()
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Check whether `self` equals `other` or lies below it.
    pub fn starts_with(&self, other: &SourcePath) -> bool {
        self.components.starts_with(&other.components)
    }
}

/// Extension of a file name, without the dot. Dotfiles have no extension.
pub(crate) fn extension_of(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl FromStr for SourcePath {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SourcePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SourcePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        let expected = SourcePath::from_components(["assets", "logo.png"]).unwrap();
        assert_eq!(SourcePath::parse("/assets/logo.png").unwrap(), expected);
        assert_eq!(SourcePath::parse("assets/logo.png").unwrap(), expected);
        assert_eq!(SourcePath::parse("./assets/logo.png").unwrap(), expected);
        assert_eq!(SourcePath::parse("//assets//logo.png").unwrap(), expected);
    }

    #[test]
    fn test_parse_keeps_sources_component() {
        let path = SourcePath::parse("/Sources/main.typ").unwrap();
        assert_eq!(path.components().collect::<Vec<_>>(), vec!["Sources", "main.typ"]);
        assert_eq!(path.to_string(), "/Sources/main.typ");
    }

    #[test]
    fn test_parse_rejects_parent_component() {
        assert!(SourcePath::parse("/a/../b").is_err());
    }

    #[test]
    fn test_display() {
        let path = SourcePath::parse("a/b.typ").unwrap();
        assert_eq!(path.to_string(), "/a/b.typ");
        assert_eq!(SourcePath::root().to_string(), "/");
    }

    #[test]
    fn test_parent_and_file_name() {
        let path = SourcePath::parse("/a/b.typ").unwrap();
        assert_eq!(path.file_name(), Some("b.typ"));
        assert_eq!(path.extension(), Some("typ"));
        assert_eq!(path.parent().unwrap().to_string(), "/a");
        assert!(SourcePath::root().parent().is_none());
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("main.typ"));
        assert!(is_valid_name("untitled 1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("."));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name(".notes.typ"));
        assert!(!is_valid_name(".DS_Store"));
        assert!(is_valid_name("Sources"));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("a\0b"));
    }

    #[test]
    fn test_extension_of_dotfile() {
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("archive.tar.gz"), Some("gz"));
        assert_eq!(extension_of("README"), None);
    }

    #[test]
    fn test_serde_as_string() {
        let path = SourcePath::parse("/chapters/intro.typ").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/chapters/intro.typ\"");
        let back: SourcePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
