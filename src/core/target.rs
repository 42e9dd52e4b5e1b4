//! Compilation targets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One independently-configured compilation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Browser-facing bundles
    Client,
    /// Server-side rendering bundles
    Server,
    /// Edge-runtime bundles (middleware)
    Edge,
}

impl Target {
    /// All targets in pass order.
    pub const ALL: [Target; 3] = [Target::Client, Target::Server, Target::Edge];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
            Self::Edge => "edge",
        }
    }

    /// Output subdirectory under the dist directory.
    pub fn output_dir(self, build_id: &str) -> String {
        match self {
            Self::Client => format!("static/{build_id}"),
            Self::Server => "server".to_string(),
            Self::Edge => "edge".to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
