use std::path::Path;

use alk_gate::GateConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Configuration for a [`LockSession`](crate::LockSession).
///
/// ```toml
/// project_prefix = "Game"
/// release_meta_sidecar = true
///
/// [gate]
/// busy_timeout_ms = 5000
/// asset_root = "Assets"
/// meta_suffix = ".meta"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub gate: GateConfig,
    /// Directory of the editor project inside the repository; empty when
    /// the project is the repository root.
    pub project_prefix: String,
    /// Also release the lock on an asset's metadata sidecar when releasing
    /// the asset, if the sidecar is recorded as locked.
    pub release_meta_sidecar: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            project_prefix: String::new(),
            release_meta_sidecar: true,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> SessionResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> SessionResult<()> {
        self.gate.validate()?;
        Ok(())
    }
}
