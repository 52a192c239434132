//! Configuration error types.

use std::fmt;
use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use thiserror::Error;

use super::FieldPath;
use crate::config::CONFIG_FILE;

/// Errors raised while loading `quire.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("no config file at `{0}`")]
    NotFound(PathBuf),

    #[error("config file is not valid TOML")]
    Toml(#[from] toml::de::Error),

    // Display already lists every problem, so no #[source]
    #[error("{0}")]
    Diagnostics(ConfigDiagnostics),
}

/// One setting that parsed but holds an unusable value.
#[derive(Debug, Clone)]
pub struct ConfigDiagnostic {
    pub field: FieldPath,
    pub message: String,
    pub hint: Option<String>,
}

impl fmt::Display for ConfigDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", format!("{}:", self.field.as_str()).bold(), self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  {}", hint.dimmed())?;
        }
        Ok(())
    }
}

/// Invalid settings collected from every section of one file.
#[derive(Debug, Default)]
pub struct ConfigDiagnostics {
    file: Option<PathBuf>,
    errors: Vec<ConfigDiagnostic>,
}

impl ConfigDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: FieldPath, message: impl Into<String>) {
        self.push(field, message.into(), None);
    }

    pub fn error_with_hint(&mut self, field: FieldPath, message: impl Into<String>, hint: impl Into<String>) {
        self.push(field, message.into(), Some(hint.into()));
    }

    fn push(&mut self, field: FieldPath, message: String, hint: Option<String>) {
        self.errors.push(ConfigDiagnostic { field, message, hint });
    }

    /// Name the file the settings were read from in the report.
    pub fn in_file(mut self, path: &Path) -> Self {
        self.file = Some(path.to_path_buf());
        self
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ConfigDiagnostic] {
        &self.errors
    }

    pub fn into_result(self) -> Result<(), ConfigError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Diagnostics(self))
        }
    }
}

/// ```text
/// 2 invalid settings in /home/me/book/quire.toml
/// - watch.debounce_ms: must be between 1 and 10000, got 0
///   set `enabled = false` to turn recompilation off
/// - preview.jpeg_quality: must be between 1 and 100, got 0
/// ```
impl fmt::Display for ConfigDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self
            .file
            .as_ref()
            .map_or_else(|| CONFIG_FILE.to_string(), |path| path.display().to_string());
        let noun = if self.errors.len() == 1 { "setting" } else { "settings" };
        write!(f, "{} invalid {noun} in {}", self.errors.len(), file.cyan())?;
        for diagnostic in &self.errors {
            write!(f, "\n- {diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigDiagnostics {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_error_names_the_file() {
        let err = ConfigError::Io(
            PathBuf::from("quire.toml"),
            Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "cannot read config file `quire.toml`");
    }

    #[test]
    fn test_diagnostics_into_result() {
        assert!(ConfigDiagnostics::new().into_result().is_ok());

        let mut diag = ConfigDiagnostics::new();
        diag.error_with_hint(FieldPath::new("watch.debounce_ms"), "must be positive", "try 300");
        assert_eq!(diag.len(), 1);
        let display = diag.into_result().unwrap_err().to_string();
        assert!(display.contains("1 invalid setting in"));
        assert!(display.contains(CONFIG_FILE));
        assert!(display.contains("watch.debounce_ms:"));
        assert!(display.contains("\n  "));
        assert!(display.contains("try 300"));
    }

    #[test]
    fn test_diagnostics_list_every_field_under_the_file() {
        let mut diag = ConfigDiagnostics::new();
        diag.error(FieldPath::new("preview.jpeg_quality"), "must be between 1 and 100, got 0");
        diag.error(FieldPath::new("preview.thumbnail_size"), "must be between 16 and 4096, got 8");
        let display = diag.in_file(Path::new("/books/quire.toml")).to_string();

        let lines: Vec<_> = display.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("2 invalid settings in"));
        assert!(lines[0].contains("/books/quire.toml"));
        assert!(lines[1].starts_with("- ") && lines[1].contains("preview.jpeg_quality:"));
        assert!(lines[2].ends_with("must be between 16 and 4096, got 8"));
    }
}
