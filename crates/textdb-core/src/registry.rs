//! # Registry
//!
//! Directory of open stores, keyed by name.
//!
//! A store is created the first time its name is opened and stays registered
//! until `shutdown`, which closes every store (stop task + final flush) and
//! empties the registry. Opening a name that is already registered returns a
//! handle to the existing store, so there is exactly one sync task per name.
//!
//! ## Process-wide registry
//!
//! `open`, `init_global` and `shutdown_global` operate on one registry shared
//! by the whole process. It is created on first use from `RegistryConfig::from_env`
//! unless `init_global` configured it earlier. Call `shutdown_global` before the
//! process exits; nothing is flushed implicitly.

use crate::config::{RegistryConfig, StoreConfig};
use crate::store::Store;
use crate::{StoreName, TextDbError};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// A set of stores sharing one root directory.
#[derive(Debug)]
pub struct Registry {
    config: RegistryConfig,
    stores: Mutex<BTreeMap<StoreName, Store>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new(config: RegistryConfig) -> Result<Self, TextDbError> {
        config.validate()?;
        Ok(Self::unchecked(config))
    }

    fn unchecked(config: RegistryConfig) -> Self {
        Self {
            config,
            stores: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<StoreName, Store>> {
        self.stores.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Open `name` with the registry's default store settings.
    pub fn open(&self, name: &str) -> Result<Store, TextDbError> {
        self.open_with(name, self.config.store.clone())
    }

    /// Open `name`, creating it with `config` if it is not registered yet.
    ///
    /// For an already registered store `config` is ignored; settings are fixed
    /// at creation.
    ///
    /// Creating a store reads its file with blocking I/O while the registry
    /// lock is held, so concurrent opens of other names wait for it.
    pub fn open_with(&self, name: &str, config: StoreConfig) -> Result<Store, TextDbError> {
        let name = StoreName::new(name)?;
        let mut stores = self.lock();

        if let Some(store) = stores.get(&name) {
            if store.config() != &config {
                tracing::debug!(
                    store = %name,
                    "Store already open, ignoring new configuration"
                );
            }
            return Ok(store.clone());
        }

        let store = Store::open(&self.config.root, name.clone(), config)?;
        stores.insert(name, store.clone());
        Ok(store)
    }

    /// The registered store called `name`, without creating it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Store> {
        let name = StoreName::new(name).ok()?;
        self.lock().get(&name).cloned()
    }

    /// Names of all registered stores, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.lock().keys().map(|n| n.as_str().to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Close every registered store and empty the registry.
    ///
    /// Every store is closed even if an earlier one fails; the first error
    /// is returned.
    pub async fn shutdown(&self) -> Result<(), TextDbError> {
        let stores = std::mem::take(&mut *self.lock());
        let mut first_error = None;

        for (name, store) in stores {
            if let Err(e) = store.close().await {
                tracing::error!(store = %name, "Final flush failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// =============================================================================
// PROCESS-WIDE REGISTRY
// =============================================================================

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// The process-wide registry, created from the environment on first use.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(|| Registry::unchecked(RegistryConfig::from_env()))
}

/// Configure the process-wide registry. Must run before its first use.
pub fn init_global(config: RegistryConfig) -> Result<&'static Registry, TextDbError> {
    let registry = Registry::new(config)?;
    GLOBAL.set(registry).map_err(|_| {
        TextDbError::InvalidConfig("global registry is already initialised".to_string())
    })?;
    Ok(global())
}

/// Open `name` in the process-wide registry.
pub fn open(name: &str) -> Result<Store, TextDbError> {
    global().open(name)
}

/// Close every store of the process-wide registry.
pub async fn shutdown_global() -> Result<(), TextDbError> {
    match GLOBAL.get() {
        Some(registry) => registry.shutdown().await,
        None => Ok(()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry(dir: &TempDir) -> Registry {
        Registry::new(RegistryConfig::with_root(dir.path())).expect("registry")
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let dir = TempDir::new().expect("tempdir");
        let registry = registry(&dir);

        let a = registry.open("S").expect("open");
        let b = registry.open("S").expect("open again");

        assert!(a.same_store(&b));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn distinct_names_get_distinct_stores() {
        let dir = TempDir::new().expect("tempdir");
        let registry = registry(&dir);

        let a = registry.open("a").expect("open");
        let b = registry.open("b").expect("open");

        assert!(!a.same_store(&b));
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn invalid_name_is_rejected_and_not_registered() {
        let dir = TempDir::new().expect("tempdir");
        let registry = registry(&dir);

        let result = registry.open("../escape");

        assert!(matches!(result, Err(TextDbError::InvalidName { .. })));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn first_config_wins() {
        let dir = TempDir::new().expect("tempdir");
        let registry = registry(&dir);

        let custom = StoreConfig::default().with_sync_interval_secs(60);
        registry.open_with("s", custom.clone()).expect("open");
        let again = registry.open("s").expect("open again");

        assert_eq!(again.config(), &custom);
    }

    #[tokio::test]
    async fn get_does_not_create() {
        let dir = TempDir::new().expect("tempdir");
        let registry = registry(&dir);

        assert!(registry.get("s").is_none());
        registry.open("s").expect("open");
        assert!(registry.get("s").is_some());
    }

    #[tokio::test]
    async fn shutdown_flushes_and_empties() {
        let dir = TempDir::new().expect("tempdir");
        let registry = registry(&dir);
        let store = registry.open("s").expect("open");
        store.set("k", "v").expect("set");

        registry.shutdown().await.expect("shutdown");

        assert!(registry.is_empty());
        assert!(store.is_closed());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("s.txt")).expect("read"),
            "k\nv"
        );

        let reopened = registry.open("s").expect("reopen");
        assert!(!reopened.same_store(&store));
        assert_eq!(reopened.get("k").expect("get"), "v");
    }

    #[test]
    fn empty_root_is_rejected() {
        let result = Registry::new(RegistryConfig::with_root(""));
        assert!(matches!(result, Err(TextDbError::InvalidConfig(_))));
    }
}
