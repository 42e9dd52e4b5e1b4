//! Route and bundle-path normalization.
//!
//! Routes are denormalized URL paths (`/`, `/about`, `/blog/post`).
//! Bundle paths are entry names under `pages/` with `/` mapped to `index`.

use std::sync::LazyLock;

use regex::Regex;

/// Entries injected into every pass (layout / shell modules).
pub const ROOT_PAGES: [&str; 3] = ["/_app", "/_error", "/_document"];

/// Routes the request gate never ensures.
pub const BLOCKED_PAGES: [&str; 2] = ["/_app", "/_document"];

static ROUTE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^pages[/\\](.+)$").expect("valid regex"));

static MIDDLEWARE_ROUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|/)_middleware$").expect("valid regex"));

static API_ROUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/api(/|$)").expect("valid regex"));

/// `/` → `/index`, `/index` → `/index/index`, others unchanged.
pub fn normalize_page_path(route: &str) -> String {
    let route = if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{route}")
    };
    if route == "/" {
        "/index".to_string()
    } else if route == "/index" || route.starts_with("/index/") {
        format!("/index{route}")
    } else {
        route
    }
}

/// Inverse of [`normalize_page_path`].
pub fn denormalize_page_path(page: &str) -> String {
    let page = page.replace('\\', "/");
    let page = if page.starts_with("/index/") {
        page["/index".len()..].to_string()
    } else if page == "/index" {
        "/".to_string()
    } else {
        page
    };
    if page.starts_with('/') {
        page
    } else {
        format!("/{page}")
    }
}

/// Entry name of a route: `pages` + normalized page path.
pub fn bundle_path(route: &str) -> String {
    format!("pages{}", normalize_page_path(route))
}

/// Resolve an entry/chunk name to a route; `None` for non-page chunks.
pub fn route_from_entry_name(name: &str) -> Option<String> {
    let caps = ROUTE_ENTRY.captures(name)?;
    Some(denormalize_page_path(&format!("/{}", &caps[1])))
}

pub fn is_middleware_route(route: &str) -> bool {
    MIDDLEWARE_ROUTE.is_match(route)
}

pub fn is_api_route(route: &str) -> bool {
    API_ROUTE.is_match(route)
}
