//! In-flight request bookkeeping.

use rustc_hash::FxHashMap;

use super::waiter::{Outcome, Ticket, Waiter};
use crate::engine::{CompileOutput, Highlighted, Suggestion};
use crate::source::SourcePath;

/// Waiters for every outstanding request of one document.
#[derive(Debug, Default)]
pub struct PendingRequests {
    /// Compile waiters in submission order. The engine reports only its
    /// latest compile, so one result resolves all of them.
    pub compile: Vec<Waiter<CompileOutput>>,
    pub highlight: KeyedWaiters<Highlighted>,
    pub autocomplete: KeyedWaiters<Vec<Suggestion>>,
    /// Callbacks that found no matching waiter.
    pub orphans: usize,
}

/// At most one waiter per source key.
#[derive(Debug)]
pub struct KeyedWaiters<T> {
    waiters: FxHashMap<SourcePath, Waiter<T>>,
}

impl<T> Default for KeyedWaiters<T> {
    fn default() -> Self {
        Self {
            waiters: FxHashMap::default(),
        }
    }
}

impl<T> KeyedWaiters<T> {
    /// Register `waiter` for `key`, returning the waiter it replaces.
    pub fn replace(&mut self, key: SourcePath, waiter: Waiter<T>) -> Option<Waiter<T>> {
        self.waiters.insert(key, waiter)
    }

    /// Remove the waiter for `key` if it belongs to `ticket`.
    ///
    /// A result carrying an older ticket belongs to a superseded request;
    /// the current waiter stays registered.
    pub fn take(&mut self, key: &SourcePath, ticket: Ticket) -> Option<Waiter<T>> {
        match self.waiters.get(key) {
            Some(waiter) if waiter.ticket() == ticket => self.waiters.remove(key),
            _ => None,
        }
    }

    pub fn contains(&self, key: &SourcePath) -> bool {
        self.waiters.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

impl PendingRequests {
    /// Resolve every compile waiter with a clone of `output`.
    /// Returns how many were waiting.
    pub fn finish_compile(&mut self, output: &CompileOutput) -> usize {
        let waiters = std::mem::take(&mut self.compile);
        let count = waiters.len();
        for waiter in waiters {
            waiter.resolve(Outcome::Done(output.clone()));
        }
        count
    }
}
