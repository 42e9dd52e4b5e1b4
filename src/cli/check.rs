//! `check` command: build every page once and report errors.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use owo_colors::OwoColorize;

use crate::actor::Coordinator;
use crate::compiler::ModuleCompiler;
use crate::config::DevConfig;
use crate::core::{EntryKey, PageKind, ROOT_PAGES, denormalize_page_path, normalize_page_path};
use crate::gate::PageBuilds;
use crate::log;
use crate::reloader::HotReloader;
use crate::tracker::PageErrors;

/// Check `routes`, or every page under the pages directory when empty.
pub fn check_pages(config: Arc<DevConfig>, routes: &[String]) -> Result<()> {
    let routes = if routes.is_empty() {
        scan_routes(&config.build.pages, &config.build.extensions)
    } else {
        routes.iter().map(|r| normalize_route(r)).collect()
    };
    if routes.is_empty() {
        log!("check"; "no pages found in {}", config.build.pages.display());
        return Ok(());
    }
    log!("check"; "checking {} page{}", routes.len(), if routes.len() == 1 { "" } else { "s" });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let report = runtime.block_on(async {
        let system = Coordinator::new(Arc::clone(&config), Arc::new(ModuleCompiler)).start()?;
        let reloader = Arc::new(HotReloader::new(&config, &system, tokio::runtime::Handle::current()));

        // Activations arriving mid-pass merge into one follow-up pass.
        let tasks: Vec<_> = routes
            .iter()
            .map(|route| {
                let reloader = Arc::clone(&reloader);
                let route = route.clone();
                tokio::spawn(async move {
                    let target = PageKind::from_route(&route).targets()[0];
                    let result = reloader.ensure_built(EntryKey::new(target, route.as_str())).await;
                    (route, result)
                })
            })
            .collect();

        let mut report = CheckReport::default();
        for task in tasks {
            let (route, result) = task.await?;
            if let Err(e) = result {
                report.add(&route, e.to_string());
            } else if let Some(errors @ PageErrors::Page(_)) = reloader.errors_for_page(&route) {
                // Unrelated errors belong to the page that caused them.
                for message in errors.messages() {
                    report.add(&route, message);
                }
            }
        }

        system.shutdown().await;
        anyhow::Ok(report)
    })?;

    report.print();
    if !report.is_empty() {
        bail!("{} of {} pages failed", report.pages.len(), routes.len());
    }
    log!("check"; "all pages compiled");
    Ok(())
}

/// Routes of every page file, root pages excluded.
fn scan_routes(pages_dir: &Path, extensions: &[String]) -> Vec<String> {
    let mut routes: Vec<String> = jwalk::WalkDir::new(pages_dir)
        .skip_hidden(true)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path();
            let ext = path.extension()?.to_str()?;
            if !extensions.iter().any(|e| e == ext) {
                return None;
            }
            let relative = path.strip_prefix(pages_dir).ok()?.with_extension("");
            Some(route_from_file(&relative.to_string_lossy()))
        })
        .filter(|route| !ROOT_PAGES.contains(&route.as_str()))
        .collect();
    routes.sort();
    routes.dedup();
    routes
}

/// `blog/index` → `/blog`, `index` → `/`.
fn route_from_file(relative: &str) -> String {
    let route = format!("/{}", relative.replace('\\', "/"));
    match route.strip_suffix("/index") {
        Some("") => "/".to_string(),
        Some(parent) => parent.to_string(),
        None => route,
    }
}

fn normalize_route(route: &str) -> String {
    denormalize_page_path(&normalize_page_path(route.trim_end_matches('/')))
}

#[derive(Debug, Default)]
struct CheckReport {
    pages: BTreeMap<String, Vec<String>>,
}

impl CheckReport {
    fn add(&mut self, route: &str, message: String) {
        self.pages.entry(route.to_string()).or_default().push(message);
    }

    fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    fn print(&self) {
        for (route, messages) in &self.pages {
            eprintln!();
            eprintln!("{}", route.bold());
            for message in messages {
                eprintln!("  {} {}", "✗".red(), message);
            }
        }
        if !self.is_empty() {
            eprintln!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_route_from_file() {
        assert_eq!(route_from_file("index"), "/");
        assert_eq!(route_from_file("about"), "/about");
        assert_eq!(route_from_file("blog/index"), "/blog");
        assert_eq!(route_from_file("api/hello"), "/api/hello");
    }

    #[test]
    fn test_scan_routes() {
        let dir = TempDir::new().unwrap();
        let pages = dir.path();
        for file in ["index.tsx", "about.ts", "_app.tsx", "blog/index.jsx", "notes.md", ".hidden.tsx"] {
            let path = pages.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        let extensions = ["tsx", "ts", "jsx", "js"].map(String::from);
        let routes = scan_routes(pages, &extensions);
        assert_eq!(routes, vec!["/", "/about", "/blog"]);
    }

    #[test]
    fn test_check_reports_broken_page() {
        let dir = TempDir::new().unwrap();
        let config = crate::config::test_config_at(dir.path());
        fs::create_dir_all(&config.build.pages).unwrap();
        fs::write(config.build.pages.join("ok.tsx"), "export default 1;\n").unwrap();
        fs::write(config.build.pages.join("bad.tsx"), "import x from './nope';\n").unwrap();
        let config = Arc::new(config);

        assert!(check_pages(Arc::clone(&config), &["/ok".to_string()]).is_ok());
        let err = check_pages(config, &[]).unwrap_err();
        assert!(err.to_string().contains("1 of 2 pages failed"));
    }
}
