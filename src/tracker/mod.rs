//! Change & Error Tracker.
//!
//! After every pass, per target:
//! - take a route → hash snapshot of the emitted chunks
//! - diff it with the previous successful snapshot
//! - rebuild the error index from the raw compile errors
//!
//! The build actor owns the [`Tracker`]; other components only see clones
//! of its [`ErrorIndex`].

mod changes;
mod errors;
mod snapshot;

pub use changes::{ChangeSet, SnapshotDiff, diff};
pub use errors::{ErrorIndex, PageErrors};
pub use snapshot::ChunkHashSnapshot;

use crate::compiler::Stats;
use crate::core::{Target, bundle_path};

/// Outcome of one target in a pass.
#[derive(Debug)]
pub enum TargetOutcome {
    Done(Stats),
    Failed(String),
}

/// What a finished pass means for connected clients.
#[derive(Debug, Default)]
pub struct PassReport {
    pub changes: ChangeSet,
    /// The document chunk hash changed; hot updates are not enough.
    pub reload_page: bool,
    /// Combined hash of the successful targets.
    pub hash: String,
}

#[derive(Debug, Default)]
pub struct Tracker {
    snapshots: [Option<ChunkHashSnapshot>; 3],
    document_hash: Option<String>,
    errors: ErrorIndex,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &ErrorIndex {
        &self.errors
    }

    pub fn snapshot(&self, target: Target) -> Option<&ChunkHashSnapshot> {
        self.snapshots[target as usize].as_ref()
    }

    /// Fold a finished pass into snapshots and the error index.
    ///
    /// Failed targets keep their previous snapshot. The first snapshot of
    /// a target produces no changes.
    pub fn record(&mut self, outcomes: &[(Target, TargetOutcome)]) -> PassReport {
        let mut client = SnapshotDiff::default();
        let mut server = SnapshotDiff::default();
        let mut report = PassReport::default();
        let mut hashes = Vec::new();

        for (target, outcome) in outcomes {
            let target = *target;
            let stats = match outcome {
                TargetOutcome::Done(stats) => stats,
                TargetOutcome::Failed(message) => {
                    self.errors.record_fatal(target, message.as_str());
                    continue;
                }
            };

            self.errors.record_stats(target, stats);
            hashes.push(stats.hash.as_str());

            let next = ChunkHashSnapshot::from_stats(stats);
            if let Some(prev) = self.snapshots[target as usize].replace(next) {
                let d = diff(&prev, self.snapshot(target).unwrap_or(&prev));
                match target {
                    Target::Client => client = d,
                    Target::Server | Target::Edge => server.merge(d),
                }
            }

            if target == Target::Server {
                report.reload_page = self.check_document(stats);
            }
        }

        report.changes = ChangeSet::classify(&client, &server);
        if !report.changes.is_empty() {
            let c = &report.changes;
            crate::debug!("build"; "{} added, {} removed, {} server-only", c.added_pages.len(), c.removed_pages.len(), c.server_only.len());
        }
        report.hash = hashes.join("-");
        report
    }

    /// Track the document chunk; `true` if its hash changed.
    fn check_document(&mut self, stats: &Stats) -> bool {
        let name = bundle_path("/_document");
        let Some(chunk) = stats.chunk(&name) else {
            crate::log!("warn"; "could not find {} chunk, full reloads on layout changes are disabled", name);
            return false;
        };
        let changed = self
            .document_hash
            .as_deref()
            .is_some_and(|prev| prev != chunk.hash);
        self.document_hash = Some(chunk.hash.clone());
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Chunk;

    fn stats(chunks: &[(&str, &str)]) -> Stats {
        Stats {
            hash: "h".into(),
            chunks: chunks
                .iter()
                .map(|(n, h)| Chunk { name: n.to_string(), hash: h.to_string() })
                .collect(),
            ..Default::default()
        }
    }

    fn pass(client: &[(&str, &str)], server: &[(&str, &str)]) -> Vec<(Target, TargetOutcome)> {
        vec![
            (Target::Client, TargetOutcome::Done(stats(client))),
            (Target::Server, TargetOutcome::Done(stats(server))),
        ]
    }

    #[test]
    fn test_first_pass_has_no_changes() {
        let mut tracker = Tracker::new();
        let report = tracker.record(&pass(
            &[("pages/about", "1")],
            &[("pages/about", "1"), ("pages/_document", "d1")],
        ));
        assert!(report.changes.is_empty());
        assert!(!report.reload_page);
    }

    #[test]
    fn test_server_only_change() {
        let mut tracker = Tracker::new();
        tracker.record(&pass(&[("pages/about", "c1")], &[("pages/about", "s1"), ("pages/_document", "d1")]));
        let report = tracker.record(&pass(&[("pages/about", "c1")], &[("pages/about", "s2"), ("pages/_document", "d1")]));

        assert_eq!(report.changes.server_only.iter().collect::<Vec<_>>(), vec!["/about"]);
        assert!(!report.reload_page);
    }

    #[test]
    fn test_document_change_reloads() {
        let mut tracker = Tracker::new();
        tracker.record(&pass(&[], &[("pages/_document", "d1")]));
        let report = tracker.record(&pass(&[], &[("pages/_document", "d2")]));
        assert!(report.reload_page);
        assert!(report.changes.server_only.is_empty());
    }

    #[test]
    fn test_missing_document_does_not_reload() {
        let mut tracker = Tracker::new();
        tracker.record(&pass(&[], &[("pages/_document", "d1")]));
        let report = tracker.record(&pass(&[], &[("pages/about", "x")]));
        assert!(!report.reload_page);
    }

    #[test]
    fn test_failed_target_keeps_snapshot() {
        let mut tracker = Tracker::new();
        tracker.record(&pass(&[("pages/a", "1")], &[]));
        let report = tracker.record(&[
            (Target::Client, TargetOutcome::Failed("boom".into())),
            (Target::Server, TargetOutcome::Done(stats(&[]))),
        ]);
        assert!(report.changes.removed_pages.is_empty());
        assert_eq!(tracker.snapshot(Target::Client).unwrap().get("/a"), Some("1"));
        assert!(tracker.errors().fatal(Target::Client).is_some());

        let report = tracker.record(&pass(&[("pages/a", "1"), ("pages/b", "1")], &[]));
        assert!(tracker.errors().fatal(Target::Client).is_none());
        assert_eq!(report.changes.added_pages.iter().collect::<Vec<_>>(), vec!["/b"]);
    }
}
