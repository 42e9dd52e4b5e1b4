//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a URL path below `serve_root` to an existing file.
///
/// Directories are never served; the dist tree has no index pages.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url)?;

    // Reject paths with suspicious patterns early
    if clean.is_empty() || clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let local = serve_root.join(&clean);

    // Canonicalize to resolve symlinks and verify path is under serve_root
    let canonical = local.canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;

    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    canonical.is_file().then_some(canonical)
}

/// Decode, strip query string and fragment, trim slashes.
fn normalize_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    Some(decoded.replace('\\', "/").trim_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn dist() -> TempDir {
        let dir = TempDir::new().unwrap();
        let pages = dir.path().join("static/development/pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("about.js"), "export default 1;").unwrap();
        fs::write(pages.join("a b.js"), "").unwrap();
        dir
    }

    #[test]
    fn test_resolve_existing_file() {
        let dir = dist();
        let path = resolve_path("static/development/pages/about.js?ts=1", dir.path()).unwrap();
        assert!(path.ends_with("pages/about.js"));
        assert!(resolve_path("static/development/pages/a%20b.js", dir.path()).is_some());
    }

    #[test]
    fn test_resolve_rejects_directories_and_missing() {
        let dir = dist();
        assert!(resolve_path("static/development/pages", dir.path()).is_none());
        assert!(resolve_path("static/development/pages/nope.js", dir.path()).is_none());
        assert!(resolve_path("", dir.path()).is_none());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("dist");
        fs::create_dir_all(&root).unwrap();
        fs::write(outer.path().join("secret.txt"), "secret").unwrap();

        assert!(resolve_path("../secret.txt", &root).is_none());
        assert!(resolve_path("%2e%2e/secret.txt", &root).is_none());
        assert!(resolve_path("static/%2e%2e%2f%2e%2e/secret.txt", &root).is_none());
    }
}
