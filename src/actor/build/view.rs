use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use crate::tracker::{ErrorIndex, PageErrors};

/// Read-only state published by the build actor between passes.
#[derive(Default)]
pub struct BuildView {
    errors: ArcSwap<ErrorIndex>,
    passes: AtomicU64,
}

impl BuildView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors_for_page(&self, route: &str) -> Option<PageErrors> {
        self.errors.load().errors_for_page(route)
    }

    /// Completed passes so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Acquire)
    }

    pub(super) fn publish(&self, errors: ErrorIndex) {
        self.errors.store(Arc::new(errors));
        self.passes.fetch_add(1, Ordering::Release);
    }
}
