//! Cross-origin headers for bundle requests from an embedding origin.

use super::GateRequest;
use crate::core::is_api_route;

/// CORS headers to attach, or `None` when the request is same-origin or
/// not a framework asset.
pub fn cors_headers(request: &GateRequest) -> Option<Vec<(String, String)>> {
    let path = request.path();
    if !(path.starts_with("/_next") || path.starts_with("/__next")) || is_api_route(path) {
        return None;
    }

    let origin = request.header("origin")?;
    if let Some(host) = request.header("host")
        && (origin == format!("http://{host}") || origin == format!("https://{host}"))
    {
        return None;
    }

    let mut headers = vec![
        ("Access-Control-Allow-Origin".to_string(), origin.to_string()),
        ("Access-Control-Allow-Methods".to_string(), "OPTIONS, GET".to_string()),
    ];
    if let Some(requested) = request.header("access-control-request-headers") {
        headers.push(("Access-Control-Allow-Headers".to_string(), requested.to_string()));
    }
    Some(headers)
}
