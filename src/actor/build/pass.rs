//! Pass start: entry sets, background compilation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use super::BuildActor;
use crate::compiler::{Compiler, EntryRequest, EntrySet, TargetConfig};
use crate::core::{EntryKey, PageKind, Target};
use crate::entry::{EnsureResult, PageError, root_entries};
use crate::hmr::HmrEvent;
use crate::tracker::TargetOutcome;

pub(in crate::actor) struct PassResult {
    pub(super) outcomes: Vec<(Target, TargetOutcome)>,
    pub(super) elapsed: Duration,
}

pub(in crate::actor) type PassTask = JoinHandle<PassResult>;

impl BuildActor {
    /// Start a pass now, or merge into the follow-up of the running one.
    pub(super) fn request_pass(&mut self) {
        if self.in_flight.is_some() {
            self.pass_requested = true;
            return;
        }
        self.start_pass();
    }

    fn start_pass(&mut self) {
        self.pass_requested = false;
        self.dispose_stale();
        self.dispose_missing();

        let building = self.registry.begin_pass();
        let mut jobs = Vec::with_capacity(Target::ALL.len());
        for target in Target::ALL {
            let mut entries =
                root_entries(&self.settings.pages_dir, &self.settings.extensions, target);
            for entry in building.iter().filter(|e| e.key.target() == target) {
                entries.insert(
                    entry.bundle_path.clone(),
                    EntryRequest::File(entry.source.clone()),
                );
            }
            jobs.push((self.settings.target(target).clone(), entries));
        }

        crate::debug!("build"; "pass started ({} active entries)", building.len());
        self.bus.publish(&HmrEvent::Building);
        self.in_flight = Some(spawn_pass(Arc::clone(&self.compiler), jobs));
    }

    /// Drop pages whose source vanished. Returns `true` if any were dropped.
    pub(super) fn dispose_missing(&mut self) -> bool {
        let mut missing: Vec<(String, PageKind)> = self
            .registry
            .iter()
            .filter(|e| !e.source.is_file())
            .map(|e| (e.key.route().to_string(), e.kind))
            .collect();
        missing.sort_by(|a, b| a.0.cmp(&b.0));
        missing.dedup_by(|a, b| a.0 == b.0);

        for (route, kind) in &missing {
            self.dispose_page(route, *kind);
        }
        !missing.is_empty()
    }

    /// Dispose every target of a page; its waiters are told it is gone.
    pub(super) fn dispose_page(&mut self, route: &str, kind: PageKind) {
        let error: EnsureResult = Err(PageError::NotFound(route.to_string()).into());
        for &target in kind.targets() {
            let key = EntryKey::new(target, route);
            if self.registry.dispose(&key).is_some() {
                crate::debug!("build"; "source of {} removed, disposing", key);
            }
            self.waiters.resolve(&key, &error);
        }
    }

    /// Evict inactive entries. Never runs while a pass is in flight.
    pub(super) fn dispose_stale(&mut self) {
        if self.in_flight.is_some() {
            return;
        }
        let now = Instant::now();

        // A pending request counts as an access on every target of its page.
        let waiting: Vec<String> = self.waiters.keys().map(|k| k.route().to_string()).collect();
        for route in waiting {
            for target in Target::ALL {
                self.registry.touch(&EntryKey::new(target, route.as_str()), now);
            }
        }

        let evicted = self.registry.dispose_stale(
            now,
            self.settings.max_inactive_age,
            self.settings.pages_buffer_length,
        );
        if !evicted.is_empty() {
            crate::debug!("build"; "disposed {} inactive entries", evicted.len());
        }
    }
}

/// Compile every target concurrently on blocking threads.
///
/// One target failing does not stop its siblings.
fn spawn_pass(compiler: Arc<dyn Compiler>, jobs: Vec<(TargetConfig, EntrySet)>) -> PassTask {
    tokio::spawn(async move {
        let start = Instant::now();
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|(config, entries)| {
                let compiler = Arc::clone(&compiler);
                let target = config.target;
                crate::debug!("build"; "{}: {}", target, entries.names().collect::<Vec<_>>().join(", "));
                let handle =
                    tokio::task::spawn_blocking(move || compiler.compile(&config, &entries));
                (target, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (target, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(stats)) => TargetOutcome::Done(stats),
                Ok(Err(failure)) => TargetOutcome::Failed(failure.to_string()),
                Err(e) => TargetOutcome::Failed(format!("compiler task failed: {e}")),
            };
            outcomes.push((target, outcome));
        }

        PassResult {
            outcomes,
            elapsed: start.elapsed(),
        }
    })
}

/// Wait for the running pass (pending forever if none).
///
/// Cancel-safe: the handle stays in place until the pass is done.
pub(super) async fn wait_pass(task: &mut Option<PassTask>) -> PassResult {
    let Some(handle) = task.as_mut() else {
        return std::future::pending().await;
    };
    let result = handle.await;
    *task = None;
    result.unwrap_or_else(|e| PassResult {
        outcomes: Target::ALL
            .into_iter()
            .map(|t| (t, TargetOutcome::Failed(format!("pass task failed: {e}"))))
            .collect(),
        elapsed: Duration::ZERO,
    })
}
