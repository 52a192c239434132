//! Engine-facing completion callbacks.

use std::sync::Arc;

use parking_lot::Mutex;

use super::pending::PendingRequests;
use super::waiter::{Outcome, Ticket};
use crate::engine::{CompileOutput, Highlighted, Suggestion};
use crate::source::SourcePath;

/// Handle the engine uses to report finished work.
///
/// Cheap to clone; may be called from any thread, including synchronously
/// from inside a `submit_*` call. A result with no matching waiter is
/// logged and dropped.
#[derive(Debug, Clone)]
pub struct CompletionSink {
    pending: Arc<Mutex<PendingRequests>>,
}

impl CompletionSink {
    pub(crate) fn new(pending: Arc<Mutex<PendingRequests>>) -> Self {
        Self { pending }
    }

    pub fn compile_finished(&self, output: CompileOutput) {
        let mut pending = self.pending.lock();
        let resolved = pending.finish_compile(&output);
        match resolved {
            0 => {
                pending.orphans += 1;
                crate::debug!("coordinator"; "dropping compile result: no waiter");
            }
            1 => {}
            n => crate::debug!("coordinator"; "compile result shared by {} waiters", n),
        }
    }

    pub fn highlight_finished(&self, ticket: Ticket, key: &SourcePath, result: Highlighted) {
        let mut pending = self.pending.lock();
        match pending.highlight.take(key, ticket) {
            Some(waiter) => waiter.resolve(Outcome::Done(result)),
            None => {
                pending.orphans += 1;
                crate::debug!("coordinator"; "dropping highlight {} for {}: no waiter", ticket, key);
            }
        }
    }

    pub fn autocomplete_finished(&self, ticket: Ticket, key: &SourcePath, suggestions: Vec<Suggestion>) {
        let mut pending = self.pending.lock();
        match pending.autocomplete.take(key, ticket) {
            Some(waiter) => waiter.resolve(Outcome::Done(suggestions)),
            None => {
                pending.orphans += 1;
                crate::debug!("coordinator"; "dropping autocomplete {} for {}: no waiter", ticket, key);
            }
        }
    }
}
