use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MetaError, MetaResult};

/// Timing of the background metadata refresher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefresherConfig {
    /// Upper bound of the random delay before the first refresh.
    pub splay_ms: u64,
    /// Delay between refreshes after the first. Must be non-zero.
    pub interval_ms: u64,
    /// Whether refreshes copy the backing store's own description.
    pub include_store_metadata: bool,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            splay_ms: 60_000,
            interval_ms: 3_600_000,
            include_store_metadata: true,
        }
    }
}

impl RefresherConfig {
    /// Parse from TOML and validate. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> MetaResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| MetaError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MetaResult<()> {
        if self.interval_ms == 0 {
            return Err(MetaError::InvalidConfig("interval_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn splay(&self) -> Duration {
        Duration::from_millis(self.splay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
