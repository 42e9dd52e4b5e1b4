//! Page source resolution against the pages directory.

use std::path::{Component, Path, PathBuf};

use super::PageError;
use crate::compiler::{EntryRequest, EntrySet};
use crate::core::{ROOT_PAGES, Target, bundle_path};
use crate::embed::pages::default_source;

/// Find the source of `route`: `<route>.<ext>` then `<route>/index.<ext>`.
pub fn resolve_page(pages_dir: &Path, route: &str, extensions: &[String]) -> Result<PathBuf, PageError> {
    let not_found = || PageError::NotFound(route.to_string());

    let relative = route.trim_start_matches('/');
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(not_found());
    }

    let base = if relative.as_os_str().is_empty() {
        pages_dir.join("index")
    } else {
        pages_dir.join(relative)
    };

    let with_ext = |path: &Path, ext: &str| {
        let mut os = path.as_os_str().to_owned();
        os.push(".");
        os.push(ext);
        PathBuf::from(os)
    };

    extensions
        .iter()
        .map(|ext| with_ext(&base, ext))
        .chain(extensions.iter().map(|ext| with_ext(&base.join("index"), ext)))
        .find(|p| p.is_file())
        .ok_or_else(not_found)
}

/// Root entries injected into every pass of `target`.
///
/// A user file in the pages directory overrides the embedded default.
pub fn root_entries(pages_dir: &Path, extensions: &[String], target: Target) -> EntrySet {
    let routes: &[&str] = match target {
        Target::Client => &ROOT_PAGES[..2],
        Target::Server => &ROOT_PAGES,
        Target::Edge => &[],
    };

    let mut entries = EntrySet::new();
    for &route in routes {
        let request = match resolve_page(pages_dir, route, extensions) {
            Ok(path) => EntryRequest::File(path),
            Err(_) => match default_source(route) {
                Some(source) => EntryRequest::Builtin(source),
                None => continue,
            },
        };
        entries.insert(bundle_path(route), request);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["tsx".into(), "js".into()]
    }

    #[test]
    fn test_resolve_page_variants() {
        let dir = TempDir::new().unwrap();
        let pages = dir.path();
        fs::write(pages.join("index.js"), "").unwrap();
        fs::write(pages.join("about.tsx"), "").unwrap();
        fs::create_dir_all(pages.join("blog")).unwrap();
        fs::write(pages.join("blog/index.tsx"), "").unwrap();

        assert_eq!(resolve_page(pages, "/", &exts()).unwrap(), pages.join("index.js"));
        assert_eq!(resolve_page(pages, "/about", &exts()).unwrap(), pages.join("about.tsx"));
        assert_eq!(resolve_page(pages, "/blog", &exts()).unwrap(), pages.join("blog/index.tsx"));
        assert_eq!(
            resolve_page(pages, "/missing", &exts()),
            Err(PageError::NotFound("/missing".into()))
        );
    }

    #[test]
    fn test_resolve_page_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let pages = dir.path().join("pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(dir.path().join("secret.js"), "").unwrap();
        assert!(resolve_page(&pages, "/../secret", &exts()).is_err());
    }

    #[test]
    fn test_root_entries_override() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_app.tsx"), "").unwrap();

        let client = root_entries(dir.path(), &exts(), Target::Client);
        assert_eq!(client.names().collect::<Vec<_>>(), vec!["pages/_app", "pages/_error"]);
        let app = client.iter().find(|(n, _)| *n == "pages/_app").unwrap().1;
        assert_eq!(app, &EntryRequest::File(dir.path().join("_app.tsx")));

        let server = root_entries(dir.path(), &exts(), Target::Server);
        assert!(server.contains("pages/_document"));
        assert!(root_entries(dir.path(), &exts(), Target::Edge).is_empty());
    }
}
