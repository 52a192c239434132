//! `[fonts]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [fonts]
//! dirs = ["fonts", "~/Library/Fonts"]
//! ```
//!
//! Relative paths resolve against the directory holding `quire.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    /// Directories scanned (recursively) for ttf/otf/ttc/otc files.
    pub dirs: Vec<PathBuf>,
}

impl FontsConfig {
    /// Expand `~` and make every directory absolute.
    pub fn normalize(&mut self, root: &Path) {
        for dir in &mut self.dirs {
            let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
            let path = PathBuf::from(expanded);
            *dir = if path.is_relative() { root.join(path) } else { path };
        }
    }
}
