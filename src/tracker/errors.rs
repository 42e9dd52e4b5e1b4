//! Compile errors attributed to pages.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::compiler::{CompileError, ModuleGraph, ModuleInfo, Stats};
use crate::core::{Target, route_from_entry_name};

/// Issuer walks stop after this many hops.
pub const MAX_ISSUER_DEPTH: usize = 256;

/// Follow issuer links from `id` to the module with no issuer.
///
/// Returns `None` for unknown modules, dangling links, cycles and chains
/// deeper than [`MAX_ISSUER_DEPTH`].
pub fn root_module<'a>(graph: &'a ModuleGraph, id: &str) -> Option<&'a ModuleInfo> {
    let mut current = graph.get(id)?;
    for _ in 0..MAX_ISSUER_DEPTH {
        match &current.issuer {
            None => return Some(current),
            Some(issuer) => current = graph.get(issuer)?,
        }
    }
    None
}

#[derive(Debug, Clone, Default)]
struct TargetErrors {
    fatal: Option<Arc<str>>,
    raw: Arc<[CompileError]>,
    by_page: BTreeMap<String, Vec<CompileError>>,
}

/// Errors reported for a page request.
#[derive(Debug, Clone)]
pub enum PageErrors {
    /// A whole target failed; nothing on it can be trusted.
    Fatal { target: Target, message: Arc<str> },
    /// Errors attributed to the page itself.
    Page(Arc<[CompileError]>),
    /// The page is clean but a target has errors elsewhere.
    Unrelated {
        target: Target,
        errors: Arc<[CompileError]>,
    },
}

impl PageErrors {
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Fatal { message, .. } => vec![message.to_string()],
            Self::Page(errors) | Self::Unrelated { errors, .. } => {
                errors.iter().map(|e| e.message.clone()).collect()
            }
        }
    }
}

/// Per-target raw errors, fatal failures and the route index.
#[derive(Debug, Clone, Default)]
pub struct ErrorIndex {
    targets: [TargetErrors; 3],
}

impl ErrorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `target`'s errors with those of a completed compile.
    pub fn record_stats(&mut self, target: Target, stats: &Stats) {
        let mut by_page: BTreeMap<String, Vec<CompileError>> = BTreeMap::new();
        for error in &stats.errors {
            let route = error
                .module
                .as_deref()
                .and_then(|id| root_module(&stats.modules, id))
                .and_then(|root| route_from_entry_name(&root.name));
            match route {
                Some(route) => by_page.entry(route).or_default().push(error.clone()),
                None => crate::debug!("build"; "unattributed {} error: {}", target, error),
            }
        }

        self.targets[target as usize] = TargetErrors {
            fatal: None,
            raw: stats.errors.clone().into(),
            by_page,
        };
    }

    /// A whole-target failure. Clears module errors of that target.
    pub fn record_fatal(&mut self, target: Target, message: impl Into<Arc<str>>) {
        self.targets[target as usize] = TargetErrors {
            fatal: Some(message.into()),
            ..Default::default()
        };
    }

    pub fn fatal(&self, target: Target) -> Option<&Arc<str>> {
        self.targets[target as usize].fatal.as_ref()
    }

    /// Errors attributed to `route` on one target.
    pub fn page_errors(&self, target: Target, route: &str) -> Option<&[CompileError]> {
        self.targets[target as usize]
            .by_page
            .get(route)
            .map(Vec::as_slice)
    }

    /// Fatal first, then the page's own errors, then any target's raw list.
    pub fn errors_for_page(&self, route: &str) -> Option<PageErrors> {
        for target in Target::ALL {
            if let Some(message) = self.fatal(target) {
                return Some(PageErrors::Fatal {
                    target,
                    message: Arc::clone(message),
                });
            }
        }

        let own: Vec<CompileError> = Target::ALL
            .iter()
            .filter_map(|&t| self.page_errors(t, route))
            .flatten()
            .cloned()
            .collect();
        if !own.is_empty() {
            return Some(PageErrors::Page(own.into()));
        }

        Target::ALL.into_iter().find_map(|target| {
            let raw = &self.targets[target as usize].raw;
            (!raw.is_empty()).then(|| PageErrors::Unrelated {
                target,
                errors: Arc::clone(raw),
            })
        })
    }

    /// Every message, fatal failures first, for status output and events.
    pub fn messages(&self) -> Vec<String> {
        let fatal = self.targets.iter().filter_map(|t| t.fatal.as_deref().map(String::from));
        let raw = self.targets.iter().flat_map(|t| t.raw.iter().map(|e| e.message.clone()));
        fatal.chain(raw).collect()
    }
}
