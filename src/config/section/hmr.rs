//! `[hmr]` section configuration.
//!
//! ```toml
//! [hmr]
//! path = "/_next/webpack-hmr"  # WebSocket upgrade path
//! port = 3001                  # WebSocket listener (default: serve.port + 1)
//! queue_capacity = 64          # pending events per subscriber
//! ping_interval = 5000         # ms between client keep-alive pings
//! ```

use serde::{Deserialize, Serialize};

use crate::config::FieldPath;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HmrConfig {
    pub path: String,
    pub port: Option<u16>,
    pub queue_capacity: usize,
    pub ping_interval: u64,
}

impl HmrConfig {
    pub const PATH: FieldPath = FieldPath::new("hmr.path");
    pub const QUEUE_CAPACITY: FieldPath = FieldPath::new("hmr.queue_capacity");
}

impl Default for HmrConfig {
    fn default() -> Self {
        Self {
            path: "/_next/webpack-hmr".to_string(),
            port: None,
            queue_capacity: 64,
            ping_interval: 5_000,
        }
    }
}
