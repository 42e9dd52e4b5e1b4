//! Build Actor - Compilation Orchestrator
//!
//! Owns the entry registry, pending waiters, chunk snapshots and the error
//! index. Nothing else mutates them; readers see the [`BuildView`] that is
//! swapped in after every pass.
//!
//! At most one pass is in flight. Triggers arriving meanwhile only set
//! `pass_requested` and are merged into a single follow-up pass.

mod dispatch;
mod pass;
mod publish;
mod view;

#[cfg(test)]
mod tests;

pub use view::BuildView;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::messages::BuildMsg;
use crate::compiler::{Compiler, FallbackBuild, TargetConfig};
use crate::config::DevConfig;
use crate::core::Target;
use crate::entry::{EntryRegistry, Waiters, root_entries};
use crate::hmr::NotificationBus;
use crate::tracker::Tracker;
use pass::PassTask;

/// Everything a pass needs that does not change while serving.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub pages_dir: PathBuf,
    pub extensions: Arc<[String]>,
    /// Indexed by `Target as usize`.
    pub targets: [TargetConfig; 3],
    pub fallback_dir: PathBuf,
    pub max_inactive_age: Duration,
    pub pages_buffer_length: usize,
}

impl BuildSettings {
    pub fn from_config(config: &DevConfig) -> Self {
        let target = |t| TargetConfig::from_config(t, config);
        let client = target(Target::Client);
        Self {
            pages_dir: config.build.pages.clone(),
            extensions: config.build.extensions.clone().into(),
            fallback_dir: client.output_dir.join("fallback"),
            targets: [client, target(Target::Server), target(Target::Edge)],
            max_inactive_age: config.on_demand.max_inactive_age(),
            pages_buffer_length: config.on_demand.pages_buffer_length,
        }
    }

    pub fn target(&self, target: Target) -> &TargetConfig {
        &self.targets[target as usize]
    }

    /// Client-only build of the root pages into the fallback directory.
    fn fallback(&self, compiler: Arc<dyn Compiler>) -> FallbackBuild {
        let mut config = self.target(Target::Client).clone();
        config.output_dir = self.fallback_dir.clone();
        let entries = root_entries(&self.pages_dir, &self.extensions, Target::Client);
        FallbackBuild::new(compiler, config, entries)
    }
}

pub struct BuildActor {
    pub(super) rx: mpsc::Receiver<BuildMsg>,
    pub(super) compiler: Arc<dyn Compiler>,
    pub(super) settings: BuildSettings,
    pub(super) registry: EntryRegistry,
    pub(super) waiters: Waiters,
    pub(super) tracker: Tracker,
    pub(super) bus: Arc<NotificationBus>,
    pub(super) view: Arc<BuildView>,
    pub(super) fallback: Arc<FallbackBuild>,
    pub(super) in_flight: Option<PassTask>,
    pub(super) pass_requested: bool,
}

impl BuildActor {
    pub fn new(
        rx: mpsc::Receiver<BuildMsg>,
        compiler: Arc<dyn Compiler>,
        settings: BuildSettings,
        bus: Arc<NotificationBus>,
        view: Arc<BuildView>,
    ) -> Self {
        let fallback = Arc::new(settings.fallback(Arc::clone(&compiler)));
        Self {
            rx,
            compiler,
            settings,
            registry: EntryRegistry::new(),
            waiters: Waiters::new(),
            tracker: Tracker::new(),
            bus,
            view,
            fallback,
            in_flight: None,
            pass_requested: false,
        }
    }
}
