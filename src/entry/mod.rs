//! Page Entry Registry.
//!
//! Tracks which pages are active on which target, their build status and
//! when they were last requested. Owned by the build actor; nothing else
//! mutates it.
//!
//! ```text
//! activate ──► Idle ──(pass starts)──► Building ──┬─► Built
//!                ▲                                └─► Idle + error
//!                └──────────── next pass ◄────────────┘
//! dispose_stale / source vanished ──► removed (Disposed)
//! ```

mod error;
mod resolve;
mod waiters;


pub use error::{BuildError, PageError};
pub use resolve::{resolve_page, root_entries};
pub use waiters::{EnsureResult, Waiter, Waiters};

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::core::{EntryKey, PageKind, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Idle,
    Building,
    Built,
    Disposed,
}

#[derive(Debug, Clone)]
pub struct PageEntry {
    pub key: EntryKey,
    pub kind: PageKind,
    /// Entry name handed to the compiler (`pages/about`).
    pub bundle_path: String,
    pub source: PathBuf,
    pub status: EntryStatus,
    pub last_accessed: Instant,
    /// Error recorded by the last pass that included this entry.
    pub error: Option<BuildError>,
}

/// Result of [`EntryRegistry::activate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHandle {
    pub key: EntryKey,
    pub status: EntryStatus,
    /// `true` if the entry did not exist before.
    pub created: bool,
}

#[derive(Debug, Default)]
pub struct EntryRegistry {
    entries: FxHashMap<EntryKey, PageEntry>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry or refresh its access time.
    pub fn activate(
        &mut self,
        key: EntryKey,
        kind: PageKind,
        bundle_path: impl Into<String>,
        source: PathBuf,
        now: Instant,
    ) -> EntryHandle {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_accessed = now;
            entry.source = source;
            return EntryHandle {
                key,
                status: entry.status,
                created: false,
            };
        }

        crate::debug!("entry"; "activate {}", key);
        self.entries.insert(
            key.clone(),
            PageEntry {
                key: key.clone(),
                kind,
                bundle_path: bundle_path.into(),
                source,
                status: EntryStatus::Idle,
                last_accessed: now,
                error: None,
            },
        );
        EntryHandle {
            key,
            status: EntryStatus::Idle,
            created: true,
        }
    }

    /// Refresh the access time. Returns `false` if the entry is not active.
    pub fn touch(&mut self, key: &EntryKey, now: Instant) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = now;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &EntryKey) -> Option<&PageEntry> {
        self.entries.get(key)
    }

    /// Remove an entry, e.g. when its source vanished.
    pub fn dispose(&mut self, key: &EntryKey) -> Option<PageEntry> {
        let mut entry = self.entries.remove(key)?;
        entry.status = EntryStatus::Disposed;
        Some(entry)
    }

    /// Evict entries idle for longer than `max_age`.
    ///
    /// The `buffer` most recently accessed entries of each target survive
    /// regardless of age. Entries in a running pass are never evicted.
    pub fn dispose_stale(&mut self, now: Instant, max_age: Duration, buffer: usize) -> Vec<EntryKey> {
        let mut by_target: FxHashMap<Target, Vec<(&EntryKey, Instant)>> = FxHashMap::default();
        for entry in self.entries.values() {
            by_target
                .entry(entry.key.target())
                .or_default()
                .push((&entry.key, entry.last_accessed));
        }

        let mut evicted = Vec::new();
        for (_, mut recent) in by_target {
            recent.sort_by(|a, b| b.1.cmp(&a.1));
            for (key, last) in recent.into_iter().skip(buffer) {
                if now.saturating_duration_since(last) > max_age
                    && self.entries[key].status != EntryStatus::Building
                {
                    evicted.push(key.clone());
                }
            }
        }

        evicted.sort();
        for key in &evicted {
            crate::debug!("entry"; "dispose {} (inactive)", key);
            self.entries.remove(key);
        }
        evicted
    }

    /// Mark every active entry as building and return them.
    pub fn begin_pass(&mut self) -> Vec<PageEntry> {
        let mut building: Vec<PageEntry> = self
            .entries
            .values_mut()
            .map(|entry| {
                entry.status = EntryStatus::Building;
                entry.clone()
            })
            .collect();
        building.sort_by(|a, b| a.key.cmp(&b.key));
        building
    }

    /// Record the outcome of a pass for one entry.
    pub fn settle(&mut self, key: &EntryKey, result: &EnsureResult) -> Option<EntryStatus> {
        let entry = self.entries.get_mut(key)?;
        if entry.status != EntryStatus::Building {
            return Some(entry.status);
        }
        match result {
            Ok(()) => {
                entry.status = EntryStatus::Built;
                entry.error = None;
            }
            Err(e) => {
                entry.status = EntryStatus::Idle;
                entry.error = Some(e.clone());
            }
        }
        Some(entry.status)
    }

    /// Keys currently being built.
    pub fn building(&self) -> Vec<EntryKey> {
        let mut keys: Vec<_> = self
            .entries
            .values()
            .filter(|e| e.status == EntryStatus::Building)
            .map(|e| e.key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageEntry> {
        self.entries.values()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
