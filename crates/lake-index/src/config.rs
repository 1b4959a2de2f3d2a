use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};

/// Tunables for [`KvIndex`](crate::KvIndex).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Branch created with every new repository unless one is named.
    pub default_branch: String,
    /// How many times an operation is re-run after losing a concurrent
    /// update before `Conflict` is returned to the caller.
    pub conflict_retries: u32,
    /// Upper bound on parent hops for history walks and ancestor checks.
    pub max_history_depth: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".to_string(),
            conflict_retries: 3,
            max_history_depth: 10_000,
        }
    }
}

impl IndexConfig {
    /// Parse from TOML. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> IndexResult<Self> {
        toml::from_str(s).map_err(|e| IndexError::invalid(format!("index config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = IndexConfig::default();
        assert_eq!(c.default_branch, "main");
        assert_eq!(c.conflict_retries, 3);
        assert_eq!(c.max_history_depth, 10_000);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = IndexConfig::from_toml_str("default_branch = \"master\"\n").unwrap();
        assert_eq!(c.default_branch, "master");
        assert_eq!(c.conflict_retries, 3);
    }

    #[test]
    fn bad_toml_is_invalid_argument() {
        let err = IndexConfig::from_toml_str("conflict_retries = \"lots\"").unwrap_err();
        assert!(matches!(err, IndexError::InvalidArgument(_)));
    }
}
