use std::sync::Arc;
use std::time::Instant;

use tokio::sync::oneshot;

use super::BuildActor;
use super::pass::wait_pass;
use crate::actor::messages::BuildMsg;
use crate::core::{EntryKey, PageKind, ROOT_PAGES, bundle_path};
use crate::entry::{BuildError, EntryStatus, PageError, Waiter, resolve_page};

impl BuildActor {
    /// Main event loop; a running pass never blocks message handling.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                msg = self.rx.recv() => match msg {
                    Some(BuildMsg::Shutdown) | None => break,
                    Some(msg) => self.dispatch(msg),
                },

                result = wait_pass(&mut self.in_flight) => self.on_pass_done(result),
            }
        }

        crate::debug!("build"; "shutting down");
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.waiters.reject_all(&BuildError::Closed);
        self.bus.close();
    }

    fn dispatch(&mut self, msg: BuildMsg) {
        match msg {
            BuildMsg::Ensure { key, reply } => self.on_ensure(key, reply),
            BuildMsg::Ping { route, reply } => {
                let kind = PageKind::from_route(&route);
                let _ = reply.send(self.touch_page(&route, kind, Instant::now()));
            }
            BuildMsg::FilesChanged(paths) => {
                crate::debug!("build"; "{} changed files", paths.len());
                self.request_pass();
            }
            BuildMsg::Rebuild => self.request_pass(),
            BuildMsg::Tick => self.dispose_stale(),
            BuildMsg::Fallback { reply } => self.on_fallback(reply),
            BuildMsg::Shutdown => {}
        }
    }

    fn on_ensure(&mut self, key: EntryKey, reply: Waiter) {
        let now = Instant::now();

        if ROOT_PAGES.contains(&key.route()) {
            return self.on_ensure_root(key, reply);
        }

        match self.registry.get(&key).map(|e| (e.kind, e.source.is_file())) {
            Some((kind, true)) => return self.on_ensure_active(key, kind, reply, now),
            // Deleted or renamed since the last pass: start over from the pages dir.
            Some((kind, false)) => {
                self.dispose_page(key.route(), kind);
                self.request_pass();
            }
            None => {}
        }

        let route = key.route().to_string();
        let kind = PageKind::from_route(&route);
        if !kind.targets().contains(&key.target()) {
            let _ = reply.send(Err(PageError::NotFound(route).into()));
            return;
        }

        let source = match resolve_page(&self.settings.pages_dir, &route, &self.settings.extensions) {
            Ok(source) => source,
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        for &target in kind.targets() {
            self.registry.activate(
                EntryKey::new(target, route.as_str()),
                kind,
                bundle_path(&route),
                source.clone(),
                now,
            );
        }
        self.waiters.add(key, reply);
        self.request_pass();
    }

    fn on_ensure_active(&mut self, key: EntryKey, kind: PageKind, reply: Waiter, now: Instant) {
        self.touch_page(key.route(), kind, now);
        match self.registry.get(&key).map(|e| (e.status, e.error.clone())) {
            Some((EntryStatus::Built, _)) => {
                let _ = reply.send(Ok(()));
            }
            // Nothing changed since the failing pass.
            Some((EntryStatus::Idle, Some(error))) if !self.pass_pending() => {
                let _ = reply.send(Err(error));
            }
            Some((EntryStatus::Building, _)) => {
                self.waiters.add(key, reply);
            }
            _ => {
                self.waiters.add(key, reply);
                self.request_pass();
            }
        }
    }

    /// An access to any target of a page counts for all of them.
    ///
    /// Returns `false` if the page has no active entry.
    fn touch_page(&mut self, route: &str, kind: PageKind, now: Instant) -> bool {
        let mut active = false;
        for &target in kind.targets() {
            active |= self.registry.touch(&EntryKey::new(target, route), now);
        }
        active
    }

    /// Root pages are part of every pass and never activated.
    fn on_ensure_root(&mut self, key: EntryKey, reply: Waiter) {
        if self.tracker.snapshot(key.target()).is_some() && !self.pass_pending() {
            let _ = reply.send(self.entry_result(&key));
            return;
        }
        self.waiters.add(key, reply);
        if self.in_flight.is_none() {
            self.request_pass();
        }
    }

    fn on_fallback(&self, reply: oneshot::Sender<crate::compiler::FallbackOutcome>) {
        let fallback = Arc::clone(&self.fallback);
        tokio::spawn(async move {
            let _ = reply.send(fallback.get().await);
        });
    }

    pub(super) fn pass_pending(&self) -> bool {
        self.in_flight.is_some() || self.pass_requested
    }
}
