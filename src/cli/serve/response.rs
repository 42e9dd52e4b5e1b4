//! HTTP response handlers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tiny_http::{Header, Request, Response, StatusCode};

use crate::gate::GateResponse;

mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const JAVASCRIPT: &str = "application/javascript; charset=utf-8";
    pub const JSON: &str = "application/json; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Content type by file extension; the dist tree is mostly scripts.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("js" | "mjs") => types::JAVASCRIPT,
        Some("map" | "json") => types::JSON,
        Some("css") => types::CSS,
        Some("html") => types::HTML,
        Some("txt") => types::PLAIN,
        _ => types::OCTET_STREAM,
    }
}

/// Send the response the gate finished with.
pub fn respond_gate(request: Request, response: GateResponse) -> Result<()> {
    let response = with_headers(
        Response::from_data(response.body).with_status_code(StatusCode(response.status)),
        &response.headers,
    );
    request.respond(response)?;
    Ok(())
}

/// Respond with a file from the dist tree plus the gate's headers.
pub fn respond_file(request: Request, path: &Path, headers: &[(String, String)]) -> Result<()> {
    let body = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    send_body(request, 200, content_type(path), body, headers)
}

pub fn respond_javascript(request: Request, body: String) -> Result<()> {
    send_body(request, 200, types::JAVASCRIPT, body.into_bytes(), &[])
}

pub fn respond_html(request: Request, status: u16, body: String) -> Result<()> {
    send_body(request, status, types::HTML, body.into_bytes(), &[])
}

pub fn respond_not_found(request: Request, headers: &[(String, String)]) -> Result<()> {
    send_body(request, 404, types::PLAIN, b"404 - Not Found".to_vec(), headers)
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, types::PLAIN, b"503 - Service Unavailable".to_vec(), &[])
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
    headers: &[(String, String)],
) -> Result<()> {
    let response = Response::from_data(body).with_status_code(StatusCode(status));
    let mut response = with_headers(response, headers);
    if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

/// Attach headers, skipping any that are not valid header bytes.
fn with_headers<R: std::io::Read>(mut response: Response<R>, headers: &[(String, String)]) -> Response<R> {
    for (name, value) in headers {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => response.add_header(header),
            Err(()) => crate::debug!("serve"; "dropping invalid header {}", name),
        }
    }
    response
}

/// Escape text for HTML bodies and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
