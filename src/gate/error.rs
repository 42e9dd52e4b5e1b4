use thiserror::Error;

use super::GateResponse;
use crate::entry::BuildError;
use crate::tracker::PageErrors;

/// Headers of every script error response; bundles must never be cached.
pub const NO_CACHE: &str = "no-cache, no-store, max-age=0, must-revalidate";

/// Everything the gate turns into an error response.
#[derive(Debug, Error)]
pub enum GateError {
    /// Malformed percent-encoding in the bundle path.
    #[error("malformed bundle path `{0}`")]
    Decode(String),

    /// The wait succeeded but the page still has errors to show.
    #[error("{}", .0.messages().join("\n"))]
    Page(PageErrors),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl GateError {
    /// Errors left after a clean wait belong to an existing page.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Decode(_) | Self::Page(_) => false,
            Self::Build(e) => e.is_not_found(),
        }
    }

    /// A missing source is 404, everything else 500.
    pub fn status(&self) -> u16 {
        if self.is_not_found() { 404 } else { 500 }
    }
}

/// Minimal plaintext error for a script request.
pub fn script_error(status: u16, mut headers: Vec<(String, String)>) -> GateResponse {
    let body = match status {
        404 => "404 - Not Found",
        _ => "500 - Internal Error",
    };
    headers.push(("Cache-Control".into(), NO_CACHE.into()));
    headers.push(("Content-Type".into(), "text/plain; charset=utf-8".into()));
    GateResponse {
        status,
        headers,
        body: body.as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileError;
    use crate::core::Target;
    use crate::entry::PageError;

    #[test]
    fn test_classification() {
        assert_eq!(GateError::Decode("/x".into()).status(), 500);
        assert_eq!(
            GateError::from(BuildError::from(PageError::NotFound("/a".into()))).status(),
            404
        );
        assert_eq!(
            GateError::from(BuildError::Fatal { target: Target::Client, message: "bad".into() })
                .status(),
            500
        );

        // An existing page with an unresolved import is a compile error.
        let missing = PageErrors::Page(vec![CompileError::not_found("./x", "Module not found")].into());
        assert_eq!(GateError::Page(missing).status(), 500);
        let missing = BuildError::Compile {
            route: "/a".into(),
            errors: vec![CompileError::not_found("./x", "Module not found")].into(),
        };
        assert_eq!(GateError::from(missing).status(), 500);
    }

    #[test]
    fn test_script_error_disables_caching() {
        let response = script_error(404, vec![]);
        assert_eq!(response.body, b"404 - Not Found");
        assert!(response.headers.iter().any(|(k, v)| k == "Cache-Control" && v == NO_CACHE));

        let response = script_error(500, vec![]);
        assert_eq!(response.body, b"500 - Internal Error");
    }
}
