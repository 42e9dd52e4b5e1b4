//! Compiler capability.
//!
//! The orchestrator never bundles anything itself. Each pass it hands a
//! [`TargetConfig`] and an explicit [`EntrySet`] snapshot to a [`Compiler`]
//! and receives either [`Stats`] (chunks, hashes, per-module errors) or a
//! [`CompilerFailure`] for the whole target.
//!
//! | Module     | Purpose                                        |
//! |------------|------------------------------------------------|
//! | `stats`    | Stats shape: chunks, module graph, errors      |
//! | `module`   | Built-in compiler following relative imports   |
//! | `fallback` | One-shot `_app` + `_error` build               |

mod fallback;
mod module;
mod stats;

#[cfg(test)]
pub mod testing;

pub use fallback::{FallbackBuild, FallbackOutcome};
pub use module::ModuleCompiler;
pub use stats::{Chunk, CompileError, ModuleGraph, ModuleInfo, Stats};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::DevConfig;
use crate::core::Target;

/// Compile a set of named entry modules into chunks.
///
/// Implementations run on a blocking thread; one call per target per pass.
pub trait Compiler: Send + Sync + 'static {
    fn compile(&self, target: &TargetConfig, entries: &EntrySet) -> Result<Stats, CompilerFailure>;
}

/// A whole-target failure. Module-level problems are `Stats::errors`.
#[derive(Debug, Error)]
pub enum CompilerFailure {
    #[error("invalid target configuration: {0}")]
    Config(String),

    #[error("failed to write `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

/// Per-target compiler configuration.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub target: Target,
    /// Chunks are written as `<output_dir>/<entry name>.js`.
    pub output_dir: PathBuf,
    /// Extensions probed when resolving extensionless imports.
    pub extensions: Arc<[String]>,
}

impl TargetConfig {
    pub fn new(target: Target, output_dir: impl Into<PathBuf>, extensions: Arc<[String]>) -> Self {
        Self {
            target,
            output_dir: output_dir.into(),
            extensions,
        }
    }

    /// Standard layout: `<dist>/static/<build_id>`, `<dist>/server`, `<dist>/edge`.
    pub fn from_config(target: Target, config: &DevConfig) -> Self {
        let output_dir = config
            .build
            .dist
            .join(target.output_dir(&config.build.build_id));
        Self::new(target, output_dir, config.build.extensions.clone().into())
    }

    /// Where the chunk for an entry name lands.
    pub fn chunk_path(&self, entry_name: &str) -> PathBuf {
        self.output_dir.join(format!("{entry_name}.js"))
    }
}

/// How to load one entry module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRequest {
    /// A source file on disk.
    File(PathBuf),
    /// An embedded default module (root pages without a user override).
    Builtin(&'static str),
}

/// Entry name → module request for one target and one pass.
///
/// Built once per pass and handed to the compiler; never mutated after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrySet {
    entries: BTreeMap<String, EntryRequest>,
}

impl EntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, request: EntryRequest) -> Self {
        self.insert(name, request);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, request: EntryRequest) {
        self.entries.insert(name.into(), request);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryRequest)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
