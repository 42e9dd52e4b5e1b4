//! Target-qualified entry keys.

use std::fmt;
use std::sync::Arc;

use super::route::{is_api_route, is_middleware_route};
use super::target::Target;

/// What kind of unit an entry compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Page,
    ApiRoute,
    Middleware,
}

impl PageKind {
    /// Infer the kind from a denormalized route.
    pub fn from_route(route: &str) -> Self {
        if is_middleware_route(route) {
            Self::Middleware
        } else if is_api_route(route) {
            Self::ApiRoute
        } else {
            Self::Page
        }
    }

    /// Targets this kind of entry compiles on.
    pub fn targets(self) -> &'static [Target] {
        match self {
            Self::Page => &[Target::Client, Target::Server],
            Self::ApiRoute => &[Target::Server],
            Self::Middleware => &[Target::Client, Target::Edge],
        }
    }
}

/// Identifier of an entry: target × route.
///
/// Displayed as `client@/about`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    target: Target,
    route: Arc<str>,
}

impl EntryKey {
    pub fn new(target: Target, route: impl Into<Arc<str>>) -> Self {
        Self {
            target,
            route: route.into(),
        }
    }

    #[inline]
    pub fn target(&self) -> Target {
        self.target
    }

    #[inline]
    pub fn route(&self) -> &str {
        &self.route
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.target, self.route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_key_display_and_order() {
        let key = EntryKey::new(Target::Client, "/about");
        assert_eq!(key.to_string(), "client@/about");
        assert!(key < EntryKey::new(Target::Server, "/about"));
        assert!(EntryKey::new(Target::Client, "/") < key);
    }

    #[test]
    fn test_page_kind_from_route() {
        assert_eq!(PageKind::from_route("/about"), PageKind::Page);
        assert_eq!(PageKind::from_route("/api/hello"), PageKind::ApiRoute);
        assert_eq!(PageKind::from_route("/api"), PageKind::ApiRoute);
        assert_eq!(PageKind::from_route("/apis"), PageKind::Page);
        assert_eq!(PageKind::from_route("/_middleware"), PageKind::Middleware);
        assert_eq!(PageKind::from_route("/shop/_middleware"), PageKind::Middleware);
    }
}
