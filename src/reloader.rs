//! `HotReloader`: the dev server's single entry point into the build side.
//!
//! - [`HotReloader::run`] gates a request before static serving
//! - [`HotReloader::upgrader`] takes over live-reload sockets

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::actor::{ActorSystem, BuildMsg, BuildView};
use crate::compiler::FallbackOutcome;
use crate::config::DevConfig;
use crate::core::EntryKey;
use crate::entry::{BuildError, EnsureResult};
use crate::gate::{GateRequest, GateResult, PageBuilds, RequestGate};
use crate::hmr::{PingHandler, Upgrader};
use crate::tracker::PageErrors;

pub struct HotReloader {
    build_tx: mpsc::Sender<BuildMsg>,
    view: Arc<BuildView>,
    gate: RequestGate,
    upgrader: Arc<Upgrader>,
    runtime: Handle,
}

impl HotReloader {
    pub fn new(config: &DevConfig, system: &ActorSystem, runtime: Handle) -> Self {
        let pings = Arc::new(BuildPings {
            build_tx: system.build_tx.clone(),
        });
        let upgrader = Upgrader::new(config.hmr.path.clone(), Arc::clone(&system.bus), pings);
        Self {
            build_tx: system.build_tx.clone(),
            view: Arc::clone(&system.view),
            gate: RequestGate::new(config.build.build_id.clone()),
            upgrader: Arc::new(upgrader),
            runtime,
        }
    }

    /// Gate a request from a non-async thread.
    ///
    /// Blocks until the page is built; never call from inside the runtime.
    pub fn run(&self, request: &GateRequest) -> GateResult {
        self.runtime.block_on(self.handle(request))
    }

    pub async fn handle(&self, request: &GateRequest) -> GateResult {
        self.gate.run(request, self).await
    }

    /// Handshake for sockets asking for the live-reload upgrade.
    pub fn upgrader(&self) -> Arc<Upgrader> {
        Arc::clone(&self.upgrader)
    }

    /// The one-shot `_app` + `_error` build, from a non-async thread.
    pub fn fallback_blocking(&self) -> FallbackOutcome {
        self.runtime.block_on(self.fallback())
    }

    pub async fn fallback(&self) -> FallbackOutcome {
        let (reply, rx) = oneshot::channel();
        if self.build_tx.send(BuildMsg::Fallback { reply }).await.is_err() {
            return Err(BuildError::Closed.to_string().into());
        }
        rx.await
            .unwrap_or_else(|_| Err(BuildError::Closed.to_string().into()))
    }
}

impl PageBuilds for HotReloader {
    async fn ensure_built(&self, key: EntryKey) -> EnsureResult {
        let (reply, rx) = oneshot::channel();
        self.build_tx
            .send(BuildMsg::Ensure { key, reply })
            .await
            .map_err(|_| BuildError::Closed)?;
        rx.await.unwrap_or(Err(BuildError::Closed))
    }

    fn errors_for_page(&self, route: &str) -> Option<PageErrors> {
        self.view.errors_for_page(route)
    }
}

/// Bridges socket threads to the build actor.
struct BuildPings {
    build_tx: mpsc::Sender<BuildMsg>,
}

impl PingHandler for BuildPings {
    fn ping(&self, page: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        let msg = BuildMsg::Ping {
            route: page.to_string(),
            reply,
        };
        // Called on connection threads, outside the runtime.
        if self.build_tx.blocking_send(msg).is_err() {
            return false;
        }
        rx.blocking_recv().unwrap_or(false)
    }
}
