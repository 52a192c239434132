//! Change watcher: debounced recompilation after tree mutations.
//!
//! ```text
//! Document mutation → NodeChange → Debouncer (trailing window) → recompile
//! ```
//!
//! The task holds only a weak reference to its target and stops once the
//! document is gone.

mod debouncer;

use std::future::Future;
use std::sync::Weak;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use debouncer::{DEBOUNCE_MS, Debouncer};

use crate::source::SourcePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// One mutation of the source tree. A rename is a removal of the old path
/// plus a creation of the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeChange {
    pub path: SourcePath,
    pub kind: ChangeKind,
}

impl NodeChange {
    pub fn new(path: SourcePath, kind: ChangeKind) -> Self {
        Self { path, kind }
    }
}

/// What the watcher drives.
pub trait RecompileTarget: Send + Sync + 'static {
    /// Whether `path` still names a node in the tree.
    fn is_attached(&self, path: &SourcePath) -> bool;

    /// Recompile and publish the result. Must not fail.
    fn recompile(&self) -> impl Future<Output = ()> + Send;
}

/// Spawn the watcher loop on the current runtime.
pub fn spawn<T: RecompileTarget>(
    changes: mpsc::UnboundedReceiver<NodeChange>,
    target: Weak<T>,
    window: Duration,
) -> JoinHandle<()> {
    tokio::spawn(run(changes, target, window))
}

async fn run<T: RecompileTarget>(
    mut changes: mpsc::UnboundedReceiver<NodeChange>,
    target: Weak<T>,
    window: Duration,
) {
    let mut debouncer = Debouncer::new(window);

    loop {
        tokio::select! {
            biased;
            change = changes.recv() => match change {
                Some(change) => debouncer.add(change),
                // Document dropped
                None => break,
            },
            _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                let Some(pending) = debouncer.take_if_ready() else {
                    continue;
                };
                let Some(target) = target.upgrade() else {
                    break;
                };
                if !should_recompile(&*target, pending.into_iter()) {
                    continue;
                }
                target.recompile().await;
            }
        }
    }

    crate::debug!("watch"; "watcher stopped");
}

/// Drop changes to nodes that were detached before the window closed.
/// A removal still counts: the document lost a node.
fn should_recompile<T: RecompileTarget>(
    target: &T,
    pending: impl Iterator<Item = (SourcePath, ChangeKind)>,
) -> bool {
    let mut relevant = false;
    for (path, kind) in pending {
        if kind == ChangeKind::Removed || target.is_attached(&path) {
            relevant = true;
        } else {
            crate::debug!("watch"; "discarding change to detached {}", path);
        }
    }
    relevant
}
