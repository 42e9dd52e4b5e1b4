//! `[on_demand]` section configuration.
//!
//! Controls how long lazily activated entries stay in the build.
//!
//! ```toml
//! [on_demand]
//! max_inactive_age = 60000     # ms without access before an entry is disposed
//! pages_buffer_length = 5      # most recent entries per target always kept
//! dispose_interval = 5000      # ms between eviction ticks
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::FieldPath;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnDemandConfig {
    pub max_inactive_age: u64,
    pub pages_buffer_length: usize,
    pub dispose_interval: u64,
}

impl OnDemandConfig {
    pub const DISPOSE_INTERVAL: FieldPath = FieldPath::new("on_demand.dispose_interval");

    pub fn max_inactive_age(&self) -> Duration {
        Duration::from_millis(self.max_inactive_age)
    }

    pub fn dispose_interval(&self) -> Duration {
        Duration::from_millis(self.dispose_interval)
    }
}

impl Default for OnDemandConfig {
    fn default() -> Self {
        Self {
            max_inactive_age: 60_000,
            pages_buffer_length: 5,
            dispose_interval: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::test_parse_config;

    #[test]
    fn test_on_demand_config() {
        let config = test_parse_config("[on_demand]\nmax_inactive_age = 1500\npages_buffer_length = 0");
        assert_eq!(config.on_demand.max_inactive_age(), Duration::from_millis(1500));
        assert_eq!(config.on_demand.pages_buffer_length, 0);
        assert_eq!(config.on_demand.dispose_interval(), Duration::from_secs(5));
    }
}
