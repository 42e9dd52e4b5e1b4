//! Timing and deduplication of raw watcher events.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::types::ChangeKind;
use crate::config::normalize_path;

pub(super) const DEBOUNCE: Duration = Duration::from_millis(300);
/// Minimum gap between two flushes.
pub(super) const COOLDOWN: Duration = Duration::from_millis(800);

/// Sleep used when nothing is pending.
const IDLE: Duration = Duration::from_secs(86400);

pub(super) struct Debouncer {
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    last_flush: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_flush: None,
        }
    }

    pub(super) fn add_event(&mut self, event: &notify::Event, now: Instant) {
        let Some(kind) = change_kind(&event.kind) else {
            return;
        };
        for path in &event.paths {
            if !is_editor_artifact(path) {
                self.record(normalize_path(path), kind, now);
            }
        }
    }

    /// Fold one change into the pending set.
    ///
    /// Removed then created is a restore; created then removed cancels out;
    /// a removal wins over an earlier modification. Otherwise first wins.
    pub(super) fn record(&mut self, path: PathBuf, kind: ChangeKind, now: Instant) {
        use ChangeKind::*;

        match (self.changes.get(&path).copied(), kind) {
            (None, _) | (Some(Removed), Created | Modified) | (Some(Modified), Removed) => {
                crate::debug!("watch"; "{} {}", kind.label(), path.display());
                self.changes.insert(path, kind);
            }
            (Some(Created), Removed) => {
                self.changes.remove(&path);
            }
            _ => return,
        }
        self.last_event = Some(now);
    }

    /// Take the pending paths once the debounce window and cooldown passed.
    pub(super) fn flush(&mut self, now: Instant) -> Option<Vec<PathBuf>> {
        if !self.is_ready(now) {
            return None;
        }
        self.last_event = None;
        self.last_flush = Some(now);

        let mut paths: Vec<_> = self.changes.drain().map(|(path, _)| path).collect();
        paths.sort();
        Some(paths)
    }

    pub(super) fn is_ready(&self, now: Instant) -> bool {
        !self.changes.is_empty() && self.remaining(now).is_some_and(|d| d.is_zero())
    }

    /// How long until a flush could happen.
    pub(super) fn sleep_duration(&self, now: Instant) -> Duration {
        self.remaining(now)
            .map_or(IDLE, |d| d.max(Duration::from_millis(1)))
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        let last_event = self.last_event?;
        let debounce = DEBOUNCE.saturating_sub(now.saturating_duration_since(last_event));
        let cooldown = self
            .last_flush
            .map_or(Duration::ZERO, |t| COOLDOWN.saturating_sub(now.saturating_duration_since(t)));
        Some(debounce.max(cooldown))
    }
}

fn change_kind(kind: &notify::EventKind) -> Option<ChangeKind> {
    use notify::EventKind;
    use notify::event::ModifyKind;

    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        // mtime/chmod noise would loop forever
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        _ => None,
    }
}

/// Swap files, backups and dotfiles.
fn is_editor_artifact(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bak" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
