//! Configuration for `quire.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [watch], [fonts], [preview]
//! ├── types/         # ConfigError, ConfigDiagnostics, FieldPath
//! └── mod.rs         # QuireConfig (this file)
//! ```
//!
//! The file is optional: without one every section takes its defaults.
//! When no path is given, `quire.toml` is searched upward from the
//! current directory.

pub mod section;
pub mod types;

pub use section::{FontsConfig, PreviewConfig, WatchConfig};
pub use types::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath};

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::document::DocumentOptions;
use crate::log;

/// Default config file name.
pub const CONFIG_FILE: &str = "quire.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing quire.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuireConfig {
    /// Absolute path to the config file, if one was loaded
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub fonts: FontsConfig,

    #[serde(default)]
    pub preview: PreviewConfig,
}

impl QuireConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the nearest `quire.toml`
    /// above the current directory is used, or defaults if there is none.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => return Err(ConfigError::NotFound(path.to_path_buf())),
            None => match find_config_file(Path::new(CONFIG_FILE)) {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        Self::from_path(&path)
    }

    /// Load and validate the file at `path`.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let (mut config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.diagnostics().in_file(path).into_result()?;

        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.fonts.normalize(&root);
        config.config_path = Some(path.to_path_buf());
        crate::debug!("config"; "loaded {}", path.display());
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields. They are ignored, not fatal.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Validate every section, collecting all problems at once.
    fn diagnostics(&self) -> ConfigDiagnostics {
        let mut diag = ConfigDiagnostics::new();
        self.watch.validate(&mut diag);
        self.preview.validate(&mut diag);
        diag
    }

    /// Per-document options derived from this configuration.
    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            watch: self.watch.enabled,
            debounce: self.watch.debounce(),
            font_dirs: self.fonts.dirs.clone(),
            thumbnail: self.preview.thumbnail,
            thumbnail_options: self.preview.thumbnail_options(),
            ..DocumentOptions::default()
        }
    }
}

/// Find config file by searching upward from current directory
fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.is_file())
}

/// Parse a config snippet for tests, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> QuireConfig {
    let (parsed, ignored) = QuireConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
