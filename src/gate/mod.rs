//! Request Gate.
//!
//! Sits in front of static serving for client bundle requests:
//! - applies CORS headers for cross-origin embedding
//! - waits for the requested page to be built
//! - turns build failures into script error responses
//!
//! A finished result means the caller must not serve anything else.

mod bundle;
mod cors;
mod error;

pub use bundle::parse_bundle_path;
pub use cors::cors_headers;
pub use error::{GateError, script_error};
#[cfg(test)]
pub use error::NO_CACHE;

use std::future::Future;

use crate::core::{BLOCKED_PAGES, EntryKey, Target};
use crate::entry::EnsureResult;
use crate::tracker::PageErrors;

/// What the gate needs from the build side.
pub trait PageBuilds: Send + Sync {
    /// Activate `key` and wait for the pass that includes it.
    fn ensure_built(&self, key: EntryKey) -> impl Future<Output = EnsureResult> + Send;

    /// Current errors to report for `route`.
    fn errors_for_page(&self, route: &str) -> Option<PageErrors>;
}

/// An incoming HTTP request, reduced to what the gate looks at.
#[derive(Debug, Clone, Default)]
pub struct GateRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl GateRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// URL without query or fragment.
    pub fn path(&self) -> &str {
        self.url.split(['?', '#']).next().unwrap_or(&self.url)
    }

    fn is_preflight(&self) -> bool {
        self.method.eq_ignore_ascii_case("OPTIONS")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct GateResult {
    /// The response is complete; skip static serving.
    pub finished: bool,
    /// Headers the caller must add to whatever it serves next.
    pub headers: Vec<(String, String)>,
    pub response: Option<GateResponse>,
}

pub struct RequestGate {
    build_id: String,
}

impl RequestGate {
    pub fn new(build_id: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
        }
    }

    pub async fn run<B: PageBuilds>(&self, request: &GateRequest, builds: &B) -> GateResult {
        let mut result = GateResult::default();

        if let Some(headers) = cors_headers(request) {
            result.headers = headers;
            if request.is_preflight() {
                result.finished = true;
                result.response = Some(GateResponse {
                    status: 200,
                    headers: result.headers.clone(),
                    body: Vec::new(),
                });
                return result;
            }
        }

        if let Err(e) = self.handle_bundle_request(request.path(), builds).await {
            let status = e.status();
            crate::debug!("gate"; "{} -> {}: {}", request.path(), status, e);
            result.finished = true;
            result.response = Some(script_error(status, result.headers.clone()));
        }
        result
    }

    /// Wait for the page behind a bundle path; `Ok` means serve it normally.
    pub async fn handle_bundle_request<B: PageBuilds>(&self, path: &str, builds: &B) -> Result<(), GateError> {
        let Some(bundle) = parse_bundle_path(path, &self.build_id)? else {
            return Ok(());
        };
        if BLOCKED_PAGES.contains(&bundle.route.as_str()) {
            return Ok(());
        }

        builds
            .ensure_built(EntryKey::new(Target::Client, bundle.route.as_str()))
            .await?;

        // A clean wait does not mean a clean build; never serve a broken script.
        match builds.errors_for_page(&bundle.route) {
            Some(errors) => Err(GateError::Page(errors)),
            None => Ok(()),
        }
    }
}
