//! Snapshot diffing and change classification.

use std::collections::BTreeSet;

use super::ChunkHashSnapshot;
use crate::core::{ROOT_PAGES, is_middleware_route};

/// Difference between two snapshots of one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub changed: BTreeSet<String>,
}

impl SnapshotDiff {
    pub fn merge(&mut self, other: SnapshotDiff) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self.changed.extend(other.changed);
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Added, removed and changed routes; the three sets are disjoint.
pub fn diff(prev: &ChunkHashSnapshot, next: &ChunkHashSnapshot) -> SnapshotDiff {
    let mut out = SnapshotDiff::default();
    for (route, hash) in next.iter() {
        match prev.get(route) {
            None => {
                out.added.insert(route.to_string());
            }
            Some(old) if old != hash => {
                out.changed.insert(route.to_string());
            }
            Some(_) => {}
        }
    }
    for (route, _) in prev.iter() {
        if !next.contains(route) {
            out.removed.insert(route.to_string());
        }
    }
    out
}

/// What changed in one pass, across targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added_pages: BTreeSet<String>,
    pub removed_pages: BTreeSet<String>,
    pub client_changed: BTreeSet<String>,
    pub server_changed: BTreeSet<String>,
    /// `server_changed - client_changed`, without root or middleware routes.
    pub server_only: BTreeSet<String>,
    /// Changed client routes that are middleware.
    pub middleware: BTreeSet<String>,
}

impl ChangeSet {
    /// `client` drives page additions and removals; `server` is the
    /// merged server and edge diff.
    pub fn classify(client: &SnapshotDiff, server: &SnapshotDiff) -> Self {
        let user_page = |route: &&String| !ROOT_PAGES.contains(&route.as_str());

        let server_only = server
            .changed
            .difference(&client.changed)
            .filter(user_page)
            .filter(|r| !is_middleware_route(r))
            .cloned()
            .collect();

        let middleware = client
            .changed
            .iter()
            .filter(|r| is_middleware_route(r))
            .cloned()
            .collect();

        Self {
            added_pages: client.added.iter().filter(user_page).cloned().collect(),
            removed_pages: client.removed.iter().filter(user_page).cloned().collect(),
            client_changed: client.changed.clone(),
            server_changed: server.changed.clone(),
            server_only,
            middleware,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added_pages.is_empty()
            && self.removed_pages.is_empty()
            && self.client_changed.is_empty()
            && self.server_changed.is_empty()
    }
}
