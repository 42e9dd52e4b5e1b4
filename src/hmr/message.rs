//! Event payloads pushed to clients, and messages clients send back.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};

/// An event published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HmrEvent {
    /// A pass started.
    Building,
    /// A pass finished.
    Built {
        hash: String,
        errors: Vec<String>,
        warnings: Vec<String>,
    },
    /// Last built state, replayed to a new subscriber.
    Sync {
        hash: String,
        errors: Vec<String>,
        warnings: Vec<String>,
    },
    /// Force a full reload.
    ReloadPage,
    ServerOnlyChanges { pages: Vec<String> },
    MiddlewareChanges,
    AddedPage(String),
    RemovedPage(String),
    /// Reply to a client ping: `true` if the page is still active.
    Pong(bool),
}

impl HmrEvent {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Building => json!({ "action": "building" }),
            Self::Built {
                hash,
                errors,
                warnings,
            } => json!({ "action": "built", "hash": hash, "errors": errors, "warnings": warnings }),
            Self::Sync {
                hash,
                errors,
                warnings,
            } => json!({ "action": "sync", "hash": hash, "errors": errors, "warnings": warnings }),
            Self::ReloadPage => json!({ "action": "reloadPage" }),
            Self::ServerOnlyChanges { pages } => {
                json!({ "event": "serverOnlyChanges", "pages": pages })
            }
            Self::MiddlewareChanges => json!({ "event": "middlewareChanges" }),
            Self::AddedPage(route) => json!({ "action": "addedPage", "data": [route] }),
            Self::RemovedPage(route) => json!({ "action": "removedPage", "data": [route] }),
            Self::Pong(true) => json!({ "success": true }),
            Self::Pong(false) => json!({ "invalid": true }),
        }
    }

    pub fn to_json(&self) -> Arc<str> {
        self.to_value().to_string().into()
    }
}

/// Messages received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientMessage {
    Ping { page: String },
}

impl ClientMessage {
    /// Parse a text frame; unknown shapes are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let mut msg: Self = serde_json::from_str(text).ok()?;
        let Self::Ping { page } = &mut msg;
        if let Ok(decoded) = percent_encoding::percent_decode_str(page).decode_utf8() {
            *page = decoded.into_owned();
        }
        Some(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_shapes() {
        assert_eq!(&*HmrEvent::ReloadPage.to_json(), r#"{"action":"reloadPage"}"#);
        assert_eq!(
            &*HmrEvent::ServerOnlyChanges { pages: vec!["/about".into()] }.to_json(),
            r#"{"event":"serverOnlyChanges","pages":["/about"]}"#
        );
        assert_eq!(&*HmrEvent::MiddlewareChanges.to_json(), r#"{"event":"middlewareChanges"}"#);
        assert_eq!(
            &*HmrEvent::AddedPage("/new".into()).to_json(),
            r#"{"action":"addedPage","data":["/new"]}"#
        );
        assert_eq!(&*HmrEvent::Pong(false).to_json(), r#"{"invalid":true}"#);
    }

    #[test]
    fn test_built_shape() {
        let value = HmrEvent::Built {
            hash: "abc".into(),
            errors: vec!["boom".into()],
            warnings: vec![],
        }
        .to_value();
        assert_eq!(value["action"], "built");
        assert_eq!(value["errors"][0], "boom");
    }

    #[test]
    fn test_parse_ping() {
        assert_eq!(
            ClientMessage::parse(r#"{"event":"ping","page":"/blog%20post"}"#),
            Some(ClientMessage::Ping { page: "/blog post".into() })
        );
        assert_eq!(ClientMessage::parse(r#"{"event":"other"}"#), None);
        assert_eq!(ClientMessage::parse("not json"), None);
    }
}
