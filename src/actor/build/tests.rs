use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};

use super::*;
use crate::compiler::testing::ScriptedCompiler;
use crate::config::test_config_at;
use crate::core::EntryKey;
use crate::entry::{BuildError, EnsureResult, PageError};
use crate::hmr::Subscription;
use crate::tracker::PageErrors;

struct Harness {
    tx: mpsc::Sender<BuildMsg>,
    compiler: Arc<ScriptedCompiler>,
    bus: Arc<NotificationBus>,
    view: Arc<BuildView>,
    dir: TempDir,
}

fn harness(pages: &[&str]) -> Harness {
    harness_with(pages, |_| {})
}

fn harness_with(pages: &[&str], tweak: impl FnOnce(&mut DevConfig)) -> Harness {
    let dir = TempDir::new().unwrap();
    let mut config = test_config_at(dir.path());
    tweak(&mut config);
    for page in pages {
        let path = config.build.pages.join(page);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "export default function Page() {}\n").unwrap();
    }

    let compiler = Arc::new(ScriptedCompiler::new());
    let bus = Arc::new(NotificationBus::new(256));
    let view = Arc::new(BuildView::new());
    let (tx, rx) = mpsc::channel(32);
    let actor = BuildActor::new(
        rx,
        compiler.clone(),
        BuildSettings::from_config(&config),
        Arc::clone(&bus),
        Arc::clone(&view),
    );
    tokio::spawn(actor.run());

    Harness {
        tx,
        compiler,
        bus,
        view,
        dir,
    }
}

impl Harness {
    fn send_ensure(&self, route: &str) -> oneshot::Receiver<EnsureResult> {
        let (reply, rx) = oneshot::channel();
        let key = EntryKey::new(Target::Client, route);
        self.tx.try_send(BuildMsg::Ensure { key, reply }).unwrap();
        rx
    }

    async fn ensure(&self, route: &str) -> EnsureResult {
        self.send_ensure(route).await.unwrap()
    }

    async fn ping(&self, route: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(BuildMsg::Ping { route: route.into(), reply })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn send(&self, msg: BuildMsg) {
        self.tx.send(msg).await.unwrap();
    }

    fn page(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join("pages").join(name)
    }
}

/// Events up to and including the next `built`.
async fn next_built(sub: &Subscription) -> Vec<String> {
    events_until(sub, r#""action":"built""#).await
}

/// Events up to and including the first one containing `needle`.
async fn events_until(sub: &Subscription, needle: &str) -> Vec<String> {
    let collect = async {
        let mut events = Vec::new();
        loop {
            match sub.rx.try_recv() {
                Ok(payload) => {
                    let done = payload.contains(needle);
                    events.push(payload.to_string());
                    if done {
                        return events;
                    }
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), collect)
        .await
        .unwrap_or_else(|_| panic!("no event matching {needle}"))
}

async fn wait_passes(view: &BuildView, n: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while view.passes() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_concurrent_ensure_shares_one_build() {
    let h = harness(&["about.tsx"]);
    let hold = h.compiler.hold();

    let first = h.send_ensure("/about");
    let second = h.send_ensure("/about");
    drop(hold);

    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
    assert_eq!(h.compiler.participations(Target::Client, "pages/about"), 1);
    assert_eq!(h.compiler.calls(Target::Client), 1);
}

#[tokio::test]
async fn test_concurrent_ensure_shares_rejection() {
    let h = harness(&["about.tsx"]);
    h.compiler.set_error(Target::Client, "pages/about", "Module not found: ./missing");
    let hold = h.compiler.hold();

    let first = h.send_ensure("/about");
    let second = h.send_ensure("/about");
    drop(hold);

    for rx in [first, second] {
        match rx.await.unwrap() {
            Err(BuildError::Compile { route, errors }) => {
                assert_eq!(route, "/about");
                assert_eq!(errors[0].message, "Module not found: ./missing");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(h.compiler.participations(Target::Client, "pages/about"), 1);
}

#[tokio::test]
async fn test_built_entry_resolves_without_new_pass() {
    let h = harness(&["about.tsx"]);
    assert!(h.ensure("/about").await.is_ok());
    assert!(h.ensure("/about").await.is_ok());
    assert_eq!(h.compiler.calls(Target::Client), 1);
    assert_eq!(h.view.passes(), 1);
}

#[tokio::test]
async fn test_missing_page_is_not_found() {
    let h = harness(&["about.tsx"]);
    let result = h.ensure("/nope").await;
    assert!(matches!(result, Err(BuildError::Page(PageError::NotFound(_)))));
    assert_eq!(h.compiler.calls(Target::Client), 0);
}

#[tokio::test]
async fn test_deleted_source_is_disposed() {
    let h = harness(&["about.tsx"]);
    assert!(h.ensure("/about").await.is_ok());

    fs::remove_file(h.page("about.tsx")).unwrap();
    h.send(BuildMsg::FilesChanged(vec![h.page("about.tsx")])).await;

    let result = h.ensure("/about").await;
    assert!(result.unwrap_err().is_not_found());
    assert!(!h.ping("/about").await);
}

#[tokio::test]
async fn test_deleted_source_without_new_pass() {
    let h = harness(&["about.tsx"]);
    let sub = h.bus.subscribe();
    assert!(h.ensure("/about").await.is_ok());
    next_built(&sub).await;

    // No watcher: nothing told the actor about the deletion.
    fs::remove_file(h.page("about.tsx")).unwrap();
    let result = h.ensure("/about").await;
    assert!(matches!(result, Err(BuildError::Page(PageError::NotFound(_)))));
    assert!(!h.ping("/about").await);

    // The follow-up pass reports the page as gone.
    let events = next_built(&sub).await;
    assert!(events.contains(&r#"{"action":"removedPage","data":["/about"]}"#.to_string()));
    assert_eq!(h.compiler.participations(Target::Client, "pages/about"), 1);
}

#[tokio::test]
async fn test_deleted_source_mid_pass() {
    let h = harness(&["about.tsx"]);
    let hold = h.compiler.hold();

    let first = h.send_ensure("/about");
    // The ping is handled after the ensure, so the pass is running now.
    assert!(h.ping("/about").await);
    fs::remove_file(h.page("about.tsx")).unwrap();
    drop(hold);

    let first = first.await.unwrap();
    assert!(first.unwrap_err().is_not_found());
    let second = h.ensure("/about").await;
    assert!(matches!(second, Err(BuildError::Page(PageError::NotFound(_)))));
    assert!(h.view.errors_for_page("/about").is_none());
}

#[tokio::test]
async fn test_renamed_source_is_picked_up() {
    let h = harness(&["about.tsx"]);
    assert!(h.ensure("/about").await.is_ok());

    fs::rename(h.page("about.tsx"), h.page("about.jsx")).unwrap();
    assert!(h.ensure("/about").await.is_ok());
    assert_eq!(h.compiler.participations(Target::Client, "pages/about"), 2);
}

#[tokio::test]
async fn test_error_kept_until_next_change() {
    let h = harness(&["about.tsx"]);
    h.compiler.set_error(Target::Client, "pages/about", "Unexpected token");

    assert!(matches!(h.ensure("/about").await, Err(BuildError::Compile { .. })));
    assert!(matches!(h.ensure("/about").await, Err(BuildError::Compile { .. })));
    assert_eq!(h.compiler.calls(Target::Client), 1);

    h.compiler.clear_error(Target::Client, "pages/about");
    h.send(BuildMsg::FilesChanged(vec![h.page("about.tsx")])).await;
    assert!(h.ensure("/about").await.is_ok());
    assert_eq!(h.compiler.calls(Target::Client), 2);
}

#[tokio::test]
async fn test_activation_mid_pass_joins_next_pass() {
    let h = harness(&["a.tsx", "b.tsx"]);
    let hold = h.compiler.hold();

    let a = h.send_ensure("/a");
    let b = h.send_ensure("/b");
    h.send(BuildMsg::FilesChanged(vec![h.page("a.tsx")])).await;
    h.send(BuildMsg::FilesChanged(vec![h.page("b.tsx")])).await;
    drop(hold);

    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());

    // Wait for the merged follow-up to finish.
    wait_passes(&h.view, 2).await;

    assert_eq!(h.compiler.calls(Target::Client), 2);
    assert_eq!(h.compiler.participations(Target::Client, "pages/a"), 2);
    assert_eq!(h.compiler.participations(Target::Client, "pages/b"), 1);
}

#[tokio::test]
async fn test_server_only_change_and_document_reload() {
    let h = harness(&["about.tsx"]);
    let sub = h.bus.subscribe();
    assert!(h.ensure("/about").await.is_ok());
    next_built(&sub).await;

    h.compiler.set_hash(Target::Server, "pages/about", "s2");
    h.send(BuildMsg::Rebuild).await;
    let events = next_built(&sub).await;
    assert!(events.contains(&r#"{"event":"serverOnlyChanges","pages":["/about"]}"#.to_string()));
    assert!(!events.iter().any(|e| e.contains("reloadPage")));

    h.compiler.set_hash(Target::Server, "pages/_document", "d2");
    h.send(BuildMsg::Rebuild).await;
    let events = next_built(&sub).await;
    assert!(events.contains(&r#"{"action":"reloadPage"}"#.to_string()));
    assert!(!events.iter().any(|e| e.contains("serverOnlyChanges")));
}

#[tokio::test]
async fn test_client_change_is_not_server_only() {
    let h = harness(&["about.tsx"]);
    let sub = h.bus.subscribe();
    assert!(h.ensure("/about").await.is_ok());
    next_built(&sub).await;

    h.compiler.set_hash(Target::Client, "pages/about", "c2");
    h.compiler.set_hash(Target::Server, "pages/about", "s2");
    h.send(BuildMsg::Rebuild).await;
    let events = next_built(&sub).await;
    assert!(!events.iter().any(|e| e.contains("serverOnlyChanges")));
    assert_eq!(events[0], r#"{"action":"building"}"#);
}

#[tokio::test]
async fn test_middleware_change() {
    let h = harness(&["_middleware.ts"]);
    let sub = h.bus.subscribe();
    assert!(h.ensure("/_middleware").await.is_ok());
    next_built(&sub).await;

    h.compiler.set_hash(Target::Client, "pages/_middleware", "m2");
    h.send(BuildMsg::Rebuild).await;
    let events = next_built(&sub).await;
    assert!(events.contains(&r#"{"event":"middlewareChanges"}"#.to_string()));
    assert_eq!(h.compiler.participations(Target::Edge, "pages/_middleware"), 2);
}

#[tokio::test]
async fn test_fatal_target_rejects_until_fixed() {
    let h = harness(&["about.tsx"]);
    h.compiler.set_fatal(Target::Client, Some("bad loader config"));

    match h.ensure("/about").await {
        Err(BuildError::Fatal { target, message }) => {
            assert_eq!(target, Target::Client);
            assert!(message.contains("bad loader config"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(h.view.errors_for_page("/other"), Some(PageErrors::Fatal { .. })));

    // Still failing and nothing changed: rejected without a pass.
    assert!(h.ensure("/about").await.is_err());
    assert_eq!(h.compiler.calls(Target::Client), 1);

    h.compiler.set_fatal(Target::Client, None);
    h.send(BuildMsg::Rebuild).await;
    assert!(h.ensure("/about").await.is_ok());
    assert!(h.view.errors_for_page("/about").is_none());
}

#[tokio::test]
async fn test_sibling_target_failure_does_not_block_client() {
    let h = harness(&["about.tsx"]);
    h.compiler.set_fatal(Target::Server, Some("server config"));

    assert!(h.ensure("/about").await.is_ok());
    assert!(matches!(
        h.view.errors_for_page("/about"),
        Some(PageErrors::Fatal { target: Target::Server, .. })
    ));
}

#[tokio::test]
async fn test_ping_refreshes_active_entries() {
    let h = harness(&["about.tsx"]);
    assert!(!h.ping("/about").await);
    assert!(h.ensure("/about").await.is_ok());
    assert!(h.ping("/about").await);
    assert!(!h.ping("/contact").await);
}

#[tokio::test]
async fn test_tick_disposes_inactive_entries() {
    let h = harness_with(&["about.tsx"], |config| {
        config.on_demand.max_inactive_age = 0;
        config.on_demand.pages_buffer_length = 0;
    });
    let sub = h.bus.subscribe();
    assert!(h.ensure("/about").await.is_ok());
    next_built(&sub).await;

    tokio::time::sleep(Duration::from_millis(10)).await;
    h.send(BuildMsg::Tick).await;
    assert!(!h.ping("/about").await);

    h.send(BuildMsg::Rebuild).await;
    let events = next_built(&sub).await;
    assert!(events.contains(&r#"{"action":"removedPage","data":["/about"]}"#.to_string()));
}

#[tokio::test]
async fn test_buffer_protects_recent_entries() {
    let h = harness_with(&["about.tsx"], |config| {
        config.on_demand.max_inactive_age = 0;
    });
    assert!(h.ensure("/about").await.is_ok());
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.send(BuildMsg::Tick).await;
    assert!(h.ping("/about").await);
}

#[tokio::test]
async fn test_browsed_page_keeps_server_entry() {
    let h = harness_with(&["a.tsx", "b.tsx"], |config| {
        config.on_demand.max_inactive_age = 200;
        config.on_demand.pages_buffer_length = 1;
    });
    assert!(h.ensure("/a").await.is_ok());
    assert!(h.ensure("/b").await.is_ok());

    // Only the client of `/a` pings; `/b` goes quiet.
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(h.ping("/a").await);
    }
    h.send(BuildMsg::Tick).await;
    assert!(!h.ping("/b").await);

    h.send(BuildMsg::Rebuild).await;
    wait_passes(&h.view, 3).await;
    assert_eq!(h.compiler.participations(Target::Server, "pages/a"), 3);
    assert_eq!(h.compiler.participations(Target::Server, "pages/b"), 1);
}

#[tokio::test]
async fn test_root_page_ensure() {
    let h = harness(&[]);
    assert!(h.ensure("/_error").await.is_ok());
    assert_eq!(h.compiler.calls(Target::Client), 1);
    assert!(h.ensure("/_error").await.is_ok());
    assert_eq!(h.compiler.calls(Target::Client), 1);
}

#[tokio::test]
async fn test_sync_replayed_after_pass() {
    let h = harness(&["about.tsx"]);
    assert!(h.ensure("/about").await.is_ok());
    let late = h.bus.subscribe();
    let first = late.rx.try_recv().unwrap();
    assert!(first.contains(r#""action":"sync""#));
}

#[tokio::test]
async fn test_fallback_built_once() {
    let h = harness(&[]);
    for _ in 0..2 {
        let (reply, rx) = oneshot::channel();
        h.send(BuildMsg::Fallback { reply }).await;
        let stats = rx.await.unwrap().unwrap();
        assert!(stats.chunk("pages/_app").is_some());
        assert!(stats.chunk("pages/_error").is_some());
    }
    assert_eq!(h.compiler.calls(Target::Client), 1);
}

#[tokio::test]
async fn test_shutdown_rejects_waiters() {
    let h = harness(&["about.tsx"]);
    let hold = h.compiler.hold();
    let pending = h.send_ensure("/about");
    h.send(BuildMsg::Shutdown).await;

    assert!(matches!(pending.await.unwrap(), Err(BuildError::Closed)));
    drop(hold);
}
