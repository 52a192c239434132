//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! enabled = true        # Recompile after edits
//! debounce_ms = 300     # Quiet period before recompiling
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Longest debounce window accepted.
const MAX_DEBOUNCE_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl WatchConfig {
    pub const DEBOUNCE_MS: FieldPath = FieldPath::new("watch.debounce_ms");

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.debounce_ms == 0 || self.debounce_ms > MAX_DEBOUNCE_MS {
            diag.error_with_hint(
                Self::DEBOUNCE_MS,
                format!("must be between 1 and {MAX_DEBOUNCE_MS}, got {}", self.debounce_ms),
                "set `enabled = false` to turn recompilation off",
            );
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: crate::watcher::DEBOUNCE_MS,
        }
    }
}
