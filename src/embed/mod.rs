//! Embedded sources.
//!
//! - `pages` - default `_app`, `_error` and `_document` modules
//! - `serve` - dev server page shell and the live-reload client script
//!
//! ```ignore
//! let js = HMR_CLIENT_JS.render(&HmrClientVars { hmr_path: cfg.hmr.path.clone(), hmr_port, ping_interval_ms: 5000 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod pages {
    pub const APP_JS: &str = include_str!("pages/_app.js");
    pub const ERROR_JS: &str = include_str!("pages/_error.js");
    pub const DOCUMENT_JS: &str = include_str!("pages/_document.js");

    /// Built-in source for a root page route.
    pub fn default_source(route: &str) -> Option<&'static str> {
        match route {
            "/_app" => Some(APP_JS),
            "/_error" => Some(ERROR_JS),
            "/_document" => Some(DOCUMENT_JS),
            _ => None,
        }
    }
}

pub mod serve {
    use super::{Template, TemplateVars};

    pub struct HmrClientVars {
        pub hmr_path: String,
        pub hmr_port: u16,
        pub ping_interval_ms: u64,
    }

    impl TemplateVars for HmrClientVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__HMR_PORT__", &self.hmr_port.to_string())
                .replace("__HMR_PATH__", &self.hmr_path)
                .replace("__PING_INTERVAL__", &self.ping_interval_ms.to_string())
        }
    }

    /// Live-reload client served next to the page bundles.
    pub const HMR_CLIENT_JS: Template<HmrClientVars> =
        Template::new(include_str!("serve/hmr-client.js"));

    /// Variables for the dev page shell. Callers HTML-escape every field.
    pub struct ShellVars {
        pub title: String,
        pub page: String,
        pub body: String,
        pub scripts: Vec<String>,
    }

    impl TemplateVars for ShellVars {
        fn apply(&self, content: &str) -> String {
            let scripts = self
                .scripts
                .iter()
                .map(|src| format!("<script type=\"module\" src=\"{src}\"></script>"))
                .collect::<Vec<_>>()
                .join("\n");
            content
                .replace("__TITLE__", &self.title)
                .replace("__PAGE__", &self.page)
                .replace("__BODY__", &self.body)
                .replace("__SCRIPTS__", &scripts)
        }
    }

    pub const SHELL_HTML: Template<ShellVars> =
        Template::new(include_str!("serve/shell.html"));
}

#[cfg(test)]
mod tests {
    use super::serve::*;

    #[test]
    fn test_hmr_client_render() {
        let js = HMR_CLIENT_JS.render(&HmrClientVars {
            hmr_path: "/_next/webpack-hmr".into(),
            hmr_port: 3001,
            ping_interval_ms: 2500,
        });
        assert!(js.contains(":3001/_next/webpack-hmr"));
        assert!(js.contains("setInterval(ping, 2500)"));
        assert!(!js.contains("__HMR_PATH__"));
    }

    #[test]
    fn test_shell_render() {
        let html = SHELL_HTML.render(&ShellVars {
            title: "about".into(),
            page: "/about".into(),
            body: String::new(),
            scripts: vec!["/a.js".to_string(), "/b.js".to_string()],
        });
        assert!(html.contains("<title>about</title>"));
        assert!(html.contains(r#"<script type="module" src="/b.js"></script>"#));
    }

    #[test]
    fn test_default_sources() {
        assert!(super::pages::default_source("/_document").is_some());
        assert!(super::pages::default_source("/about").is_none());
    }
}
