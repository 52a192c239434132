use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::time::Instant;

use super::{ChangeKind, NodeChange};
use crate::source::SourcePath;

pub const DEBOUNCE_MS: u64 = 300;

/// Idle sleep when nothing is pending.
const IDLE: Duration = Duration::from_secs(86400);

/// Trailing debounce over node changes.
///
/// Every change resets the window; when it elapses, all collected changes
/// are released together.
#[derive(Debug)]
pub struct Debouncer {
    /// Path -> ChangeKind (dedup is free via key uniqueness)
    changes: FxHashMap<SourcePath, ChangeKind>,
    last_event: Option<Instant>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            window,
        }
    }

    /// Record a change, collapsing it with an earlier one for the same path:
    /// - Removed + Created/Modified -> the new kind (node came back)
    /// - Modified + Removed -> Removed
    /// - Created + Removed -> Removed (a removal always recompiles)
    /// - otherwise the first kind wins
    pub fn add(&mut self, change: NodeChange) {
        let NodeChange { path, kind } = change;
        self.last_event = Some(Instant::now());

        let Some(&existing) = self.changes.get(&path) else {
            crate::debug!("watch"; "{} {}", kind.label(), path);
            self.changes.insert(path, kind);
            return;
        };

        match (existing, kind) {
            (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified)
            | (ChangeKind::Created | ChangeKind::Modified, ChangeKind::Removed) => {
                crate::debug!("watch"; "{}->{}: {}", existing.label(), kind.label(), path);
                self.changes.insert(path, kind);
            }
            _ => {}
        }
    }

    /// Take the collected changes once the window has elapsed.
    pub fn take_if_ready(&mut self) -> Option<FxHashMap<SourcePath, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        Some(std::mem::take(&mut self.changes))
    }

    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        last_event.elapsed() >= self.window && !self.changes.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Precise sleep duration until the window can close.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return IDLE;
        };
        self.window
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}
