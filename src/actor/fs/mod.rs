//! FileSystem Actor
//!
//! Watches the project root and sends debounced changes to the BuildActor.
//!
//! ```text
//! notify → Debouncer (timing, dedup) → filter → BuildMsg::FilesChanged
//! ```

mod debouncer;
mod types;


use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::messages::BuildMsg;
use debouncer::Debouncer;

/// Directories never worth a rebuild.
const IGNORED_DIRS: [&str; 2] = ["node_modules", ".git"];

/// FileSystem Actor - watches for source changes
pub struct FsActor {
    /// Sync notify callback → actor loop
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Must stay alive while watching
    _watcher: RecommendedWatcher,
    filter: ChangeFilter,
    build_tx: mpsc::Sender<BuildMsg>,
}

impl FsActor {
    /// Start watching immediately; events buffer until `run`.
    pub fn new(root: &Path, dist: &Path, build_tx: mpsc::Sender<BuildMsg>) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        crate::debug!("watch"; "watching {}", root.display());

        Ok(Self {
            notify_rx,
            _watcher: watcher,
            filter: ChangeFilter::new(dist),
            build_tx,
        })
    }

    pub async fn run(self) {
        let Self {
            notify_rx,
            _watcher,
            filter,
            build_tx,
        } = self;
        let mut debouncer = Debouncer::new();

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) => debouncer.add_event(&event, Instant::now()),
                    None => break,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration(Instant::now())) => {
                    let Some(paths) = debouncer.flush(Instant::now()) else {
                        continue;
                    };
                    let paths = filter.apply(paths);
                    if paths.is_empty() {
                        continue;
                    }
                    if build_tx.send(BuildMsg::FilesChanged(paths)).await.is_err() {
                        break;
                    }
                }
            }
        }
        crate::debug!("watch"; "stopped");
    }
}

/// Drops build output and vendored directories.
pub(super) struct ChangeFilter {
    dist: PathBuf,
}

impl ChangeFilter {
    pub(super) fn new(dist: &Path) -> Self {
        Self {
            dist: crate::config::normalize_path(dist),
        }
    }

    pub(super) fn apply(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths
            .into_iter()
            .filter(|path| self.is_source(path))
            .collect()
    }

    fn is_source(&self, path: &Path) -> bool {
        !path.starts_with(&self.dist)
            && !path.components().any(|c| match c {
                Component::Normal(name) => IGNORED_DIRS.iter().any(|d| name == *d),
                _ => false,
            })
    }
}
