use std::sync::Arc;

use thiserror::Error;

use crate::compiler::CompileError;
use crate::core::Target;

/// Page resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    /// No source file for the route (or it vanished).
    #[error("page `{0}` not found")]
    NotFound(String),
}

/// Why an `ensure_built` wait was rejected.
///
/// Cloned to every waiter of the same key.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error("failed to compile `{route}`: {}", first_message(errors))]
    Compile {
        route: String,
        errors: Arc<[CompileError]>,
    },

    #[error("{target} compilation failed: {message}")]
    Fatal { target: Target, message: Arc<str> },

    #[error("build orchestrator is not running")]
    Closed,
}

fn first_message(errors: &[CompileError]) -> &str {
    errors.first().map(|e| e.message.as_str()).unwrap_or("")
}

impl BuildError {
    /// Only a missing source maps to 404. A page that exists but fails to
    /// compile is a 500, even when the failure is an unresolved import.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Page(PageError::NotFound(_)))
    }
}
