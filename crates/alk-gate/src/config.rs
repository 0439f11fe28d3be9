use std::time::Duration;

use alk_cache::ProjectionRules;
use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// Longest accepted busy timeout (10 minutes).
const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;

/// Configuration for lock gating and asset decoration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// How long a lock operation may hold the busy gate before the watchdog
    /// clears it (default: 5000).
    pub busy_timeout_ms: u64,
    /// Directory under which assets are decorated (default: `Assets`).
    pub asset_root: String,
    /// Suffix of metadata sidecar files (default: `.meta`).
    pub meta_suffix: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        let rules = ProjectionRules::default();
        Self {
            busy_timeout_ms: 5_000,
            asset_root: rules.asset_root,
            meta_suffix: rules.meta_suffix,
        }
    }
}

impl GateConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// The status projection rules this configuration implies.
    pub fn projection_rules(&self) -> ProjectionRules {
        ProjectionRules {
            asset_root: self.asset_root.clone(),
            meta_suffix: self.meta_suffix.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), GateError> {
        if self.busy_timeout_ms == 0 || self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(GateError::TimeoutOutOfBounds {
                value: self.busy_timeout_ms,
                max: MAX_BUSY_TIMEOUT_MS,
            });
        }
        // Every path ends with "", so an empty suffix would hide everything.
        if self.meta_suffix.is_empty() {
            return Err(GateError::Config("meta_suffix must not be empty".into()));
        }
        Ok(())
    }
}
