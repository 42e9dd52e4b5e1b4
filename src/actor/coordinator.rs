//! Actor Coordinator - wires up the build and watch actors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::build::{BuildActor, BuildSettings, BuildView};
use super::fs::FsActor;
use super::messages::BuildMsg;
use crate::compiler::Compiler;
use crate::config::DevConfig;
use crate::hmr::NotificationBus;

const CHANNEL_BUFFER: usize = 64;

/// How long shutdown waits for the build actor to reject its waiters.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub struct Coordinator {
    config: Arc<DevConfig>,
    compiler: Arc<dyn Compiler>,
    watch: bool,
}

/// Handles to a running actor system.
pub struct ActorSystem {
    pub build_tx: mpsc::Sender<BuildMsg>,
    pub view: Arc<BuildView>,
    pub bus: Arc<NotificationBus>,
    build: JoinHandle<()>,
    helpers: Vec<JoinHandle<()>>,
}

impl Coordinator {
    pub fn new(config: Arc<DevConfig>, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            config,
            compiler,
            watch: false,
        }
    }

    /// Rebuild on file changes.
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Spawn the actors on the current tokio runtime and queue the first pass.
    pub fn start(self) -> Result<ActorSystem> {
        let config = self.config;
        let (build_tx, build_rx) = mpsc::channel::<BuildMsg>(CHANNEL_BUFFER);
        let bus = Arc::new(NotificationBus::new(config.hmr.queue_capacity));
        let view = Arc::new(BuildView::new());

        let actor = BuildActor::new(
            build_rx,
            self.compiler,
            BuildSettings::from_config(&config),
            Arc::clone(&bus),
            Arc::clone(&view),
        );
        let build = tokio::spawn(actor.run());

        let mut helpers = Vec::new();
        if self.watch {
            let fs = FsActor::new(&config.root, &config.build.dist, build_tx.clone())
                .context("failed to start file watcher")?;
            helpers.push(tokio::spawn(fs.run()));
        }
        helpers.push(tokio::spawn(tick(
            build_tx.clone(),
            config.on_demand.dispose_interval(),
        )));

        build_tx
            .try_send(BuildMsg::Rebuild)
            .context("build actor is not accepting messages")?;
        crate::debug!("actor"; "start (watch: {})", self.watch);

        Ok(ActorSystem {
            build_tx,
            view,
            bus,
            build,
            helpers,
        })
    }
}

impl ActorSystem {
    /// Stop watching, reject pending waiters, close subscribers.
    pub async fn shutdown(self) {
        for helper in &self.helpers {
            helper.abort();
        }
        let _ = self.build_tx.send(BuildMsg::Shutdown).await;
        if tokio::time::timeout(SHUTDOWN_GRACE, self.build).await.is_err() {
            crate::debug!("actor"; "build actor did not stop in time");
        }
        crate::debug!("actor"; "stopped");
    }
}

/// Periodic disposal of inactive entries.
async fn tick(build_tx: mpsc::Sender<BuildMsg>, every: Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if build_tx.send(BuildMsg::Tick).await.is_err() {
            break;
        }
    }
}
