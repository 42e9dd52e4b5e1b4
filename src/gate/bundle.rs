//! Client bundle URL parsing.

use super::GateError;
use crate::core::denormalize_page_path;

/// A recognized `/_next/static/<build-id>/pages/<path>.js` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    pub route: String,
    pub source_map: bool,
}

/// `Ok(None)` for anything that is not a page bundle of this build.
pub fn parse_bundle_path(url: &str, build_id: &str) -> Result<Option<BundleRequest>, GateError> {
    let path = url.split(['?', '#']).next().unwrap_or(url);

    let Some(rest) = path
        .strip_prefix("/_next/static/")
        .and_then(|p| p.strip_prefix(build_id))
        .and_then(|p| p.strip_prefix("/pages/"))
    else {
        return Ok(None);
    };

    let (page, source_map) = if let Some(page) = rest.strip_suffix(".js.map") {
        (page, true)
    } else if let Some(page) = rest.strip_suffix(".js") {
        (page, false)
    } else {
        return Ok(None);
    };

    if page.is_empty() {
        return Ok(None);
    }

    let mut decoded = String::with_capacity(page.len() + 1);
    for segment in page.split('/') {
        decoded.push('/');
        decoded.push_str(&decode_segment(segment).ok_or_else(|| GateError::Decode(path.to_string()))?);
    }

    Ok(Some(BundleRequest {
        route: denormalize_page_path(&decoded),
        source_map,
    }))
}

/// Strict percent-decoding: a stray `%` or invalid UTF-8 is an error.
fn decode_segment(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    for (i, _) in segment.match_indices('%') {
        let hex = bytes.get(i + 1..i + 3)?;
        if !hex.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }
    }
    percent_encoding::percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}
