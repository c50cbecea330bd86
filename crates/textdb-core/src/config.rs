//! # Configuration
//!
//! Settings for a registry and the stores it creates.
//!
//! Configuration is fixed when a store is created. Changing the registry's
//! defaults afterwards only affects stores opened later.
//!
//! ## Sources
//!
//! - `Default`: root `textdb`, 15 second interval, newline separator
//! - TOML file (`RegistryConfig::load`)
//! - Environment (`RegistryConfig::from_env`):
//!   - `TEXTDB_ROOT`: root directory for backing files
//!   - `TEXTDB_SYNC_INTERVAL_SECS`: seconds between sync cycles
//!   - `TEXTDB_SEPARATOR`: separator token
//!
//! ```toml
//! root = "data/textdb"
//!
//! [store]
//! sync_interval_secs = 30
//! separator = "|"
//! ```

use crate::primitives::{DEFAULT_ROOT, DEFAULT_SYNC_INTERVAL_SECS, MIN_SYNC_INTERVAL_SECS};
use crate::{Separator, TextDbError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the root directory.
pub const ENV_ROOT: &str = "TEXTDB_ROOT";

/// Environment variable holding the sync interval in seconds.
pub const ENV_SYNC_INTERVAL: &str = "TEXTDB_SYNC_INTERVAL_SECS";

/// Environment variable holding the separator token.
pub const ENV_SEPARATOR: &str = "TEXTDB_SEPARATOR";

// =============================================================================
// STORE CONFIG
// =============================================================================

/// Per-store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Seconds between two sync cycles.
    pub sync_interval_secs: u64,
    /// Token separating keys and values in the backing file.
    pub separator: Separator,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            separator: Separator::default(),
        }
    }
}

impl StoreConfig {
    /// Set the sync interval in seconds.
    #[must_use]
    pub fn with_sync_interval_secs(mut self, secs: u64) -> Self {
        self.sync_interval_secs = secs;
        self
    }

    /// Set the separator token.
    #[must_use]
    pub fn with_separator(mut self, separator: Separator) -> Self {
        self.separator = separator;
        self
    }

    /// The sync interval as a `Duration`.
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<(), TextDbError> {
        if self.sync_interval_secs < MIN_SYNC_INTERVAL_SECS {
            return Err(TextDbError::InvalidConfig(format!(
                "sync interval must be at least {} second(s), got {}",
                MIN_SYNC_INTERVAL_SECS, self.sync_interval_secs
            )));
        }
        Ok(())
    }
}

// =============================================================================
// REGISTRY CONFIG
// =============================================================================

/// Settings for a registry: where files live, and defaults for new stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Directory holding one `<name>.txt` file per store.
    pub root: PathBuf,
    /// Settings applied to stores opened without explicit configuration.
    pub store: StoreConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            store: StoreConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Default configuration rooted at `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, TextDbError> {
        let config: Self =
            toml::from_str(text).map_err(|e| TextDbError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextDbError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| TextDbError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Defaults overridden by the `TEXTDB_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `TEXTDB_*` names.
    ///
    /// Unusable values are logged and ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(root) = lookup(ENV_ROOT).filter(|s| !s.is_empty()) {
            config.root = PathBuf::from(root);
        }

        if let Some(raw) = lookup(ENV_SYNC_INTERVAL) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs >= MIN_SYNC_INTERVAL_SECS => config.store.sync_interval_secs = secs,
                _ => tracing::warn!(
                    "Ignoring invalid {}='{}', using {} seconds",
                    ENV_SYNC_INTERVAL,
                    raw,
                    config.store.sync_interval_secs
                ),
            }
        }

        if let Some(raw) = lookup(ENV_SEPARATOR) {
            match Separator::new(raw) {
                Ok(separator) => config.store.separator = separator,
                Err(e) => tracing::warn!("Ignoring {}: {}", ENV_SEPARATOR, e),
            }
        }

        config
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<(), TextDbError> {
        if self.root.as_os_str().is_empty() {
            return Err(TextDbError::InvalidConfig(
                "root directory cannot be empty".to_string(),
            ));
        }
        self.store.validate()
    }
}

// =============================================================================
// TESTS
// =============================================================================
