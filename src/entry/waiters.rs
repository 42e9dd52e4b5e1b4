//! Pending `ensure_built` waiters, one shared wait per key.

use rustc_hash::FxHashMap;
use tokio::sync::oneshot;

use super::BuildError;
use crate::core::EntryKey;

pub type EnsureResult = Result<(), BuildError>;
pub type Waiter = oneshot::Sender<EnsureResult>;

#[derive(Default)]
pub struct Waiters {
    pending: FxHashMap<EntryKey, Vec<Waiter>>,
}

impl Waiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a waiter. Returns `true` if it is the first one for `key`.
    pub fn add(&mut self, key: EntryKey, waiter: Waiter) -> bool {
        let waiters = self.pending.entry(key).or_default();
        waiters.push(waiter);
        waiters.len() == 1
    }

    /// Broadcast `result` to every waiter of `key`. Returns how many were waiting.
    pub fn resolve(&mut self, key: &EntryKey, result: &EnsureResult) -> usize {
        let Some(waiters) = self.pending.remove(key) else {
            return 0;
        };
        let count = waiters.len();
        for waiter in waiters {
            // Receiver dropped: the request went away, nothing to do.
            let _ = waiter.send(result.clone());
        }
        count
    }

    pub fn reject_all(&mut self, error: &BuildError) {
        for (_, waiters) in self.pending.drain() {
            for waiter in waiters {
                let _ = waiter.send(Err(error.clone()));
            }
        }
    }

    pub fn is_waiting(&self, key: &EntryKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Keys with at least one pending waiter.
    pub fn keys(&self) -> impl Iterator<Item = &EntryKey> {
        self.pending.keys()
    }
}
