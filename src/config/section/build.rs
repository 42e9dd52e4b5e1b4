//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! pages = "pages"                        # page sources
//! dist = ".devpack"                      # build output
//! extensions = ["tsx", "ts", "jsx", "js"]
//! build_id = "development"               # client bundle URL segment
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::FieldPath;

/// Build paths and source resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Page sources directory (absolute after loading).
    pub pages: PathBuf,

    /// Output directory (absolute after loading).
    pub dist: PathBuf,

    /// Page file extensions, probed in order.
    pub extensions: Vec<String>,

    /// Path segment of client bundle URLs.
    pub build_id: String,
}

impl BuildConfig {
    pub const PAGES: FieldPath = FieldPath::new("build.pages");
    pub const EXTENSIONS: FieldPath = FieldPath::new("build.extensions");
    pub const BUILD_ID: FieldPath = FieldPath::new("build.build_id");
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            pages: PathBuf::from("pages"),
            dist: PathBuf::from(".devpack"),
            extensions: ["tsx", "ts", "jsx", "js"].map(String::from).to_vec(),
            build_id: "development".to_string(),
        }
    }
}
