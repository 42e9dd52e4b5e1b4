//! One-shot fallback build.
//!
//! Before the first pass completes there is nothing to render an error
//! page with. The fallback compiles only `_app` and `_error` for the client
//! into its own output directory, at most once per process.

use std::sync::Arc;

use tokio::sync::OnceCell;

use super::{Compiler, EntrySet, Stats, TargetConfig};

pub type FallbackOutcome = Result<Arc<Stats>, Arc<str>>;

pub struct FallbackBuild {
    compiler: Arc<dyn Compiler>,
    target: TargetConfig,
    entries: EntrySet,
    outcome: OnceCell<FallbackOutcome>,
}

impl FallbackBuild {
    pub fn new(compiler: Arc<dyn Compiler>, target: TargetConfig, entries: EntrySet) -> Self {
        Self {
            compiler,
            target,
            entries,
            outcome: OnceCell::new(),
        }
    }

    /// Build on first call; every later or concurrent call shares that result.
    pub async fn get(&self) -> FallbackOutcome {
        self.outcome
            .get_or_init(|| async {
                let compiler = Arc::clone(&self.compiler);
                let target = self.target.clone();
                let entries = self.entries.clone();
                crate::debug!("build"; "compiling fallback ({} entries)", entries.len());

                tokio::task::spawn_blocking(move || compiler.compile(&target, &entries))
                    .await
                    .map_err(|e| Arc::<str>::from(format!("fallback build panicked: {e}")))?
                    .map(Arc::new)
                    .map_err(|e| Arc::<str>::from(e.to_string()))
            })
            .await
            .clone()
    }
}
